//! Report text layout: which lines appear, in which order and style.

use pntp_core::{AssessmentRecord, CriterionAnswer};

use crate::sanitize::sanitize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Title,
    Subtitle,
    Topic,
    Question,
    Criterion,
}

/// One logical line of the report, already sanitized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub style: LineStyle,
    pub text: String,
}

impl Line {
    fn new(style: LineStyle, text: impl AsRef<str>) -> Self {
        Self {
            style,
            text: sanitize(text.as_ref()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportLayout {
    pub lines: Vec<Line>,
}

impl ReportLayout {
    pub fn topic_count(&self) -> usize {
        self.count(LineStyle::Topic)
    }

    pub fn question_count(&self) -> usize {
        self.count(LineStyle::Question)
    }

    pub fn criterion_count(&self) -> usize {
        self.count(LineStyle::Criterion)
    }

    fn count(&self, style: LineStyle) -> usize {
        self.lines.iter().filter(|l| l.style == style).count()
    }
}

/// Lay out the non-compliance report for a record.
///
/// Header first (title, type and date). Then, in stored order, each topic
/// with at least one non-compliant criterion, each such question, and one
/// line per non-compliant criterion. Compliant criteria never appear.
pub fn build_layout(record: &AssessmentRecord) -> ReportLayout {
    let mut lines = vec![
        Line::new(LineStyle::Title, format!("Avaliação de {}", record.entity_name)),
        Line::new(
            LineStyle::Subtitle,
            format!(
                "Tipo: {} - Data: {}",
                record.entity_type,
                record.formatted_timestamp()
            ),
        ),
    ];

    for (topic, questions) in record.answers.iter() {
        let mut block = Vec::new();
        for (question, criteria) in questions.iter() {
            let failing: Vec<Line> = criteria
                .iter()
                .filter(|(_, answer)| answer.is_non_compliant())
                .map(|(criterion, answer)| Line::new(LineStyle::Criterion, criterion_line(criterion, answer)))
                .collect();
            if failing.is_empty() {
                continue;
            }
            block.push(Line::new(LineStyle::Question, format!("- {question}")));
            block.extend(failing);
        }

        if !block.is_empty() {
            lines.push(Line::new(LineStyle::Topic, topic));
            lines.extend(block);
        }
    }

    ReportLayout { lines }
}

fn criterion_line(criterion: &str, answer: &CriterionAnswer) -> String {
    let mut line = format!("  - {criterion}: {}", answer.status);
    if !answer.note.is_empty() {
        line.push_str(&format!(" | Obs: {}", answer.note));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use pntp_core::{Answers, EntityType, QuestionAnswers, Status, TopicAnswers};
    use pretty_assertions::assert_eq;

    fn answer(status: Status, note: &str) -> CriterionAnswer {
        CriterionAnswer {
            status,
            note: note.to_string(),
        }
    }

    fn record(answers: Answers) -> AssessmentRecord {
        let mut record = AssessmentRecord::new("São Paulo", EntityType::Legislative, answers);
        record.timestamp = NaiveDateTime::parse_from_str("2025-05-06 14:07", "%Y-%m-%d %H:%M").unwrap();
        record
    }

    fn texts(layout: &ReportLayout) -> Vec<(LineStyle, &str)> {
        layout.lines.iter().map(|l| (l.style, l.text.as_str())).collect()
    }

    #[test]
    fn empty_record_has_header_only() {
        let layout = build_layout(&record(Answers::new()));
        assert_eq!(
            texts(&layout),
            vec![
                (LineStyle::Title, "Avaliação de São Paulo"),
                (LineStyle::Subtitle, "Tipo: Câmara - Data: 2025-05-06 14:07"),
            ]
        );
    }

    #[test]
    fn fully_compliant_record_has_no_topic_sections() {
        let mut criteria = QuestionAnswers::new();
        criteria.insert("Disponibilidade", CriterionAnswer::default());
        criteria.insert("Formato", answer(Status::Compliant, "nota ignorada"));
        let mut questions = TopicAnswers::new();
        questions.insert("Publicação de Atas", criteria);
        let mut answers = Answers::new();
        answers.insert("Acesso à Informação", questions);

        let layout = build_layout(&record(answers));
        assert_eq!(layout.topic_count(), 0);
        assert_eq!(layout.lines.len(), 2);
    }

    #[test]
    fn lists_only_non_compliant_entries_in_order() {
        let mut atas = QuestionAnswers::new();
        atas.insert("Disponibilidade", CriterionAnswer::non_compliant());
        atas.insert("Formato", CriterionAnswer::non_compliant());
        atas.insert("Tempestividade", CriterionAnswer::non_compliant());
        let mut pauta = QuestionAnswers::new();
        pauta.insert("Disponibilidade", CriterionAnswer::default());
        let mut regimento = QuestionAnswers::new();
        regimento.insert("Disponibilidade", CriterionAnswer::default());
        regimento.insert("Atualidade", answer(Status::NonCompliant, "versão de 1990 – desatualizada"));

        let mut acesso = TopicAnswers::new();
        acesso.insert("Publicação de Atas", atas);
        acesso.insert("Pauta das Sessões", pauta.clone());
        let mut silent = TopicAnswers::new();
        silent.insert("Pauta das Sessões", pauta);
        let mut institucional = TopicAnswers::new();
        institucional.insert("Regimento Interno", regimento);

        let mut answers = Answers::new();
        answers.insert("Acesso à Informação", acesso);
        answers.insert("Tópico sem pendências", silent);
        answers.insert("Institucional", institucional);

        let layout = build_layout(&record(answers));
        assert_eq!(
            texts(&layout)[2..].to_vec(),
            vec![
                (LineStyle::Topic, "Acesso à Informação"),
                (LineStyle::Question, "- Publicação de Atas"),
                (LineStyle::Criterion, "  - Disponibilidade: Não Atende"),
                (LineStyle::Criterion, "  - Formato: Não Atende"),
                (LineStyle::Criterion, "  - Tempestividade: Não Atende"),
                (LineStyle::Topic, "Institucional"),
                (LineStyle::Question, "- Regimento Interno"),
                (
                    LineStyle::Criterion,
                    "  - Atualidade: Não Atende | Obs: versão de 1990 - desatualizada"
                ),
            ]
        );
        assert_eq!(layout.topic_count(), 2);
        assert_eq!(layout.question_count(), 2);
        assert_eq!(layout.criterion_count(), 4);
    }

    #[test]
    fn header_strings_are_sanitized() {
        let mut record = record(Answers::new());
        record.entity_name = "Santa Bárbara d’Oeste".into();
        let layout = build_layout(&record);
        assert_eq!(layout.lines[0].text, "Avaliação de Santa Bárbara d'Oeste");
    }
}
