//! Terminal rendering of forms and saved assessments.
//!
//! Everything writes to a caller-supplied `Write` so commands print to
//! stdout and tests capture into a buffer.

use std::io::{self, Write};

use pntp_core::{AssessmentRecord, Form, FormField, FormQuestion};

/// Print every topic, question and criterion of a form.
///
/// With `help` set, each question is followed by its explanation and legal
/// basis when the explanation catalog has them.
pub fn print_form(out: &mut impl Write, heading: &str, form: &Form<'_>, help: bool) -> io::Result<()> {
    writeln!(out, "=== {heading} ===")?;
    writeln!(out)?;
    for topic in form.topics() {
        writeln!(out, "{}", topic.name)?;
        for question in &topic.questions {
            print_question(out, question, help)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn print_question(out: &mut impl Write, question: &FormQuestion<'_>, help: bool) -> io::Result<()> {
    writeln!(out, "  {}", question.name())?;
    if help {
        print_help(out, question)?;
    }
    for field in question.fields() {
        writeln!(out, "    {}", field_line(&field))?;
    }
    Ok(())
}

pub fn print_help(out: &mut impl Write, question: &FormQuestion<'_>) -> io::Result<()> {
    let Some(explanation) = question.explanation else {
        return Ok(());
    };
    if let Some(text) = &explanation.explanation {
        writeln!(out, "    ℹ {text}")?;
    }
    if let Some(basis) = &explanation.base_legal {
        writeln!(out, "    Base legal: {basis}")?;
    }
    Ok(())
}

fn field_line(field: &FormField<'_>) -> String {
    let mut line = format!("{:<26} {}", field.criterion, field.answer.status);
    if !field.answer.note.is_empty() {
        line.push_str(&format!(" | Obs: {}", field.answer.note));
    }
    if field.locked {
        line.push_str(" (bloqueado)");
    }
    line
}

/// Header block for a saved assessment.
pub fn print_record_header(out: &mut impl Write, record: &AssessmentRecord) -> io::Result<()> {
    writeln!(out, "  {:<26} {}", "municipio", record.entity_name)?;
    writeln!(out, "  {:<26} {}", "tipo", record.entity_type)?;
    writeln!(out, "  {:<26} {}", "data", record.formatted_timestamp())?;
    writeln!(out, "  {:<26} {}", "key", record.key())?;
    writeln!(out, "  {:<26} {}", "não atende", record.non_compliant_count())?;
    writeln!(out)
}

pub fn print_keys(out: &mut impl Write, keys: &[String]) -> io::Result<()> {
    if keys.is_empty() {
        writeln!(out, "(nenhuma avaliação salva)")?;
        return Ok(());
    }
    for key in keys {
        writeln!(out, "{key}")?;
    }
    writeln!(out)?;
    writeln!(out, "{} avaliação(ões)", keys.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pntp_core::{CriteriaCatalog, EntityType, ExplanationCatalog, Status};
    use pretty_assertions::assert_eq;

    const CATALOG: &str = r#"{
        "Prefeitura": {
            "Receitas": {
                "Arrecadação": {"Disponibilidade": {}, "Série histórica": {}}
            }
        }
    }"#;

    const EXPLANATIONS: &str = r#"{
        "Arrecadação": {"explicacao": "Receitas previstas e arrecadadas.", "base_legal": "LC 101/2000"}
    }"#;

    fn render(help: bool, unavailable: bool) -> String {
        let catalog = CriteriaCatalog::from_json(CATALOG).unwrap();
        let explanations = ExplanationCatalog::from_json(EXPLANATIONS).unwrap();
        let mut form = Form::new(catalog.topics(EntityType::Executive), &explanations, None);
        if unavailable {
            form.set_note("Receitas", "Arrecadação", "Disponibilidade", "fora do ar")
                .unwrap();
            form.set_status("Receitas", "Arrecadação", "Disponibilidade", Status::NonCompliant)
                .unwrap();
        }
        let mut out = Vec::new();
        print_form(&mut out, "Prefeitura", &form, help).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn form_lists_criteria_with_help() {
        let expected = "\
=== Prefeitura ===

Receitas
  Arrecadação
    ℹ Receitas previstas e arrecadadas.
    Base legal: LC 101/2000
    Disponibilidade            Atende
    Série histórica            Atende

";
        assert_eq!(render(true, false), expected);
    }

    #[test]
    fn locked_fields_are_marked() {
        let rendered = render(false, true);
        assert!(rendered.contains("Disponibilidade            Não Atende | Obs: fora do ar\n"));
        assert!(rendered.contains("Série histórica            Não Atende (bloqueado)\n"));
        assert!(!rendered.contains("Base legal"));
    }

    #[test]
    fn empty_key_list_says_so() {
        let mut out = Vec::new();
        print_keys(&mut out, &[]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "(nenhuma avaliação salva)\n");
    }
}
