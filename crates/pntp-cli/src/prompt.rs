//! Interactive questionnaire over a line-oriented terminal.

use std::io::{self, BufRead, Write};

use pntp_core::{AVAILABILITY, Form, QuestionSpec, Status};

use crate::display;

/// Walks a [`Form`] question by question, reading one answer per line.
///
/// An empty reply keeps the value shown in brackets. Locked criteria are
/// skipped. Availability is asked first so the cascade applies before the
/// remaining criteria of the question come up.
pub struct Prompter<R, W> {
    input: R,
    out: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, out: W) -> Self {
        Self { input, out }
    }

    /// Returns `false` when input ended before the last question; answers
    /// given so far stay in the form.
    pub fn fill(&mut self, form: &mut Form<'_>) -> anyhow::Result<bool> {
        let questions: Vec<(&str, &QuestionSpec)> = form
            .topics()
            .iter()
            .flat_map(|t| t.questions.iter().map(move |q| (t.name, q.spec)))
            .collect();

        let mut current_topic = None;
        for (topic, spec) in questions {
            if current_topic != Some(topic) {
                writeln!(self.out, "\n== {topic} ==")?;
                current_topic = Some(topic);
            }
            writeln!(self.out, "\n{}", spec.name)?;
            if let Some(question) = form.question(topic, &spec.name) {
                display::print_help(&mut self.out, question)?;
            }

            let availability_first = spec
                .criteria
                .iter()
                .filter(|c| c.as_str() == AVAILABILITY)
                .chain(spec.criteria.iter().filter(|c| c.as_str() != AVAILABILITY));
            for criterion in availability_first {
                let Some(field) = form
                    .question(topic, &spec.name)
                    .and_then(|q| q.fields().find(|f| f.criterion == criterion.as_str()))
                    .filter(|f| !f.locked)
                    .map(|f| f.answer.clone())
                else {
                    continue;
                };

                let Some(status) = self.ask_status(criterion, field.status)? else {
                    return Ok(false);
                };
                form.set_status(topic, &spec.name, criterion, status)?;
                let Some(note) = self.ask_note(&field.note)? else {
                    return Ok(false);
                };
                form.set_note(topic, &spec.name, criterion, note)?;
            }

            if form.question(topic, &spec.name).is_some_and(|q| q.locked()) {
                writeln!(
                    self.out,
                    "  {AVAILABILITY} não atende: demais critérios marcados como Não Atende."
                )?;
            }
        }
        Ok(true)
    }

    fn ask(&mut self, prompt: &str) -> io::Result<Option<String>> {
        write!(self.out, "{prompt}")?;
        self.out.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn ask_status(&mut self, criterion: &str, current: Status) -> io::Result<Option<Status>> {
        loop {
            let prompt = format!("  {criterion} [{current}] (a = Atende, n = Não Atende): ");
            let Some(reply) = self.ask(&prompt)? else {
                return Ok(None);
            };
            match parse_status(&reply, current) {
                Some(status) => return Ok(Some(status)),
                None => writeln!(self.out, "  resposta inválida: {reply:?}")?,
            }
        }
    }

    /// `-` clears the note.
    fn ask_note(&mut self, current: &str) -> io::Result<Option<String>> {
        let prompt = if current.is_empty() {
            "    Observação: ".to_string()
        } else {
            format!("    Observação [{current}] (- limpa): ")
        };
        Ok(self.ask(&prompt)?.map(|reply| match reply.as_str() {
            "" => current.to_string(),
            "-" => String::new(),
            _ => reply,
        }))
    }
}

fn parse_status(reply: &str, current: Status) -> Option<Status> {
    match reply.to_lowercase().as_str() {
        "" => Some(current),
        "a" | "s" => Some(Status::Compliant),
        "n" => Some(Status::NonCompliant),
        _ => reply.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pntp_core::{AssessmentRecord, CriteriaCatalog, CriterionAnswer, EntityType, ExplanationCatalog};
    use std::io::Cursor;

    const CATALOG: &str = r#"{
        "Câmara": {
            "Acesso à Informação": {
                "Publicação de Atas": {"Formato": {}, "Disponibilidade": {}, "Tempestividade": {}},
                "Regimento Interno": {"Formato": {}}
            }
        }
    }"#;

    fn run(input: &str) -> (bool, AssessmentRecord, String) {
        let catalog = CriteriaCatalog::from_json(CATALOG).unwrap();
        let explanations = ExplanationCatalog::default();
        let mut form = Form::new(catalog.topics(EntityType::Legislative), &explanations, None);
        let mut out = Vec::new();
        let completed = Prompter::new(Cursor::new(input.to_string()), &mut out)
            .fill(&mut form)
            .unwrap();
        let record = form.to_record("Olinda", EntityType::Legislative);
        (completed, record, String::from_utf8(out).unwrap())
    }

    fn criterion<'r>(record: &'r AssessmentRecord, question: &str, name: &str) -> &'r CriterionAnswer {
        record.answer("Acesso à Informação", question, name).unwrap()
    }

    #[test]
    fn unavailable_question_skips_siblings() {
        // Disponibilidade = n with a note, then straight to Regimento Interno.
        let (completed, record, out) = run("n\nsite fora do ar\na\n\n");
        assert!(completed);
        let atas = "Publicação de Atas";
        assert_eq!(criterion(&record, atas, "Disponibilidade").note, "site fora do ar");
        assert!(criterion(&record, atas, "Formato").is_non_compliant());
        assert!(criterion(&record, atas, "Tempestividade").is_non_compliant());
        assert_eq!(criterion(&record, "Regimento Interno", "Formato").status, Status::Compliant);
        assert!(out.contains("demais critérios marcados como Não Atende"));
        assert!(!out.contains("Tempestividade ["));
    }

    #[test]
    fn empty_replies_keep_defaults_and_invalid_ones_repeat() {
        let (completed, record, out) = run("\n\ntalvez\nn\nPDF escaneado\n\n\n\n\n");
        assert!(completed);
        assert!(out.contains("resposta inválida: \"talvez\""));
        let formato = criterion(&record, "Publicação de Atas", "Formato");
        assert_eq!(formato.status, Status::NonCompliant);
        assert_eq!(formato.note, "PDF escaneado");
        assert_eq!(record.non_compliant_count(), 1);
    }

    #[test]
    fn end_of_input_stops_early() {
        let (completed, record, _) = run("n\n");
        assert!(!completed);
        assert!(criterion(&record, "Publicação de Atas", "Disponibilidade").is_non_compliant());
    }

    #[test]
    fn status_shortcuts() {
        assert_eq!(parse_status("", Status::NonCompliant), Some(Status::NonCompliant));
        assert_eq!(parse_status("N", Status::Compliant), Some(Status::NonCompliant));
        assert_eq!(parse_status("Atende", Status::NonCompliant), Some(Status::Compliant));
        assert_eq!(parse_status("Não Atende", Status::Compliant), Some(Status::NonCompliant));
        assert_eq!(parse_status("x", Status::Compliant), None);
    }
}
