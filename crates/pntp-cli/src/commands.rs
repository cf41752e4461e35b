//! Subcommand implementations.

use std::io::{BufRead, Write};

use anyhow::{Context, bail};
use clap::Args;
use pntp_core::{
    AssessmentRecord, CriteriaCatalog, EntityType, ExplanationCatalog, Form, Status,
    ValidationError, derive_key,
};
use pntp_store::{AssessmentStore, SaveReceipt, StoreError};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::display;
use crate::prompt::Prompter;

/// The `(entity name, entity type)` pair a command works on.
#[derive(Debug, Clone, Args)]
pub struct Target {
    /// Municipality name.
    #[arg(long = "municipio")]
    pub entity_name: String,

    /// Entity type: Prefeitura or Câmara.
    #[arg(long = "tipo")]
    pub entity_type: EntityType,
}

impl Target {
    /// The trimmed entity name, or a validation error when it is blank.
    fn entity_name(&self) -> anyhow::Result<&str> {
        let name = self.entity_name.trim();
        if name.is_empty() {
            warn!(tipo = %self.entity_type, "entity name is empty; nothing was saved");
            return Err(ValidationError::EmptyEntityName.into());
        }
        Ok(name)
    }
}

/// A saved key, or a `(name, type)` pair, picking the assessment to open.
#[derive(Debug, Clone, Args)]
pub struct Selector {
    /// Key of a saved assessment, as printed by `list`.
    #[arg(long, conflicts_with_all = ["entity_name", "entity_type"])]
    pub key: Option<String>,

    /// Municipality name.
    #[arg(long = "municipio", required_unless_present = "key")]
    pub entity_name: Option<String>,

    /// Entity type: Prefeitura or Câmara.
    #[arg(long = "tipo", required_unless_present = "key")]
    pub entity_type: Option<EntityType>,
}

/// One non-interactive edit.
#[derive(Debug, Clone, Args)]
pub struct Edit {
    #[arg(long = "topico")]
    pub topic: String,

    #[arg(long = "pergunta")]
    pub question: String,

    #[arg(long = "criterio")]
    pub criterion: String,

    /// Atende or "Não Atende".
    #[arg(long)]
    pub status: Option<Status>,

    /// Note for the criterion; an empty string clears it.
    #[arg(long = "obs")]
    pub note: Option<String>,
}

/// Loaded catalogs plus the configured store.
pub struct App {
    config: AppConfig,
    criteria: CriteriaCatalog,
    explanations: ExplanationCatalog,
    store: Box<dyn AssessmentStore>,
}

impl App {
    pub fn open(config: AppConfig) -> anyhow::Result<Self> {
        let criteria = CriteriaCatalog::load(&config.criteria_path)
            .context("loading criteria catalog")?;
        let explanations = if config.explanations_path.exists() {
            ExplanationCatalog::load(&config.explanations_path)
                .context("loading explanation catalog")?
        } else {
            warn!(
                path = %config.explanations_path.display(),
                "explanation catalog not found; questions will have no help text"
            );
            ExplanationCatalog::default()
        };
        let store = config.open_store()?;
        Ok(Self::with_parts(config, criteria, explanations, store))
    }

    pub fn with_parts(
        config: AppConfig,
        criteria: CriteriaCatalog,
        explanations: ExplanationCatalog,
        store: Box<dyn AssessmentStore>,
    ) -> Self {
        Self {
            config,
            criteria,
            explanations,
            store,
        }
    }

    /// The saved record for a target, if any.
    ///
    /// A malformed saved record counts as absent unless strict mode is on.
    async fn prior(
        &self,
        entity_name: &str,
        entity_type: EntityType,
    ) -> anyhow::Result<Option<AssessmentRecord>> {
        self.tolerate_corrupt(self.store.load(entity_name, entity_type).await)
    }

    fn tolerate_corrupt(
        &self,
        loaded: Result<Option<AssessmentRecord>, StoreError>,
    ) -> anyhow::Result<Option<AssessmentRecord>> {
        match loaded {
            Ok(record) => Ok(record),
            Err(err) if err.is_corrupt() && !self.config.strict => {
                warn!(error = %err, "saved assessment is malformed; starting from an empty one");
                Ok(None)
            }
            Err(err) => Err(anyhow::Error::new(err).context("loading saved assessment")),
        }
    }

    /// Resolve a selector into its target and saved record.
    ///
    /// A key must name an existing record; a `(name, type)` pair may be new.
    async fn select(&self, selector: &Selector) -> anyhow::Result<(Target, Option<AssessmentRecord>)> {
        if let Some(key) = &selector.key {
            let loaded = self.store.load_key(key).await;
            let Some(record) = self.tolerate_corrupt(loaded)? else {
                bail!("no saved assessment under key {key:?}");
            };
            let target = Target {
                entity_name: record.entity_name.clone(),
                entity_type: record.entity_type,
            };
            return Ok((target, Some(record)));
        }

        let (Some(entity_name), Some(entity_type)) = (&selector.entity_name, selector.entity_type)
        else {
            bail!("pass --key, or both --municipio and --tipo");
        };
        let target = Target {
            entity_name: entity_name.clone(),
            entity_type,
        };
        let prior = self.prior(target.entity_name()?, entity_type).await?;
        Ok((target, prior))
    }

    fn form(&self, entity_type: EntityType, prior: Option<&AssessmentRecord>) -> Form<'_> {
        Form::new(self.criteria.topics(entity_type), &self.explanations, prior)
    }

    async fn save(&self, record: &AssessmentRecord) -> anyhow::Result<SaveReceipt> {
        self.store
            .save(record)
            .await
            .with_context(|| format!("saving assessment {}", record.key()))
    }

    pub fn catalog(&self, out: &mut impl Write, entity_type: EntityType) -> anyhow::Result<()> {
        let form = self.form(entity_type, None);
        if form.topics().is_empty() {
            writeln!(out, "(nenhum tópico para {entity_type})")?;
            return Ok(());
        }
        display::print_form(out, entity_type.label(), &form, true)?;
        Ok(())
    }

    pub async fn list(&self, out: &mut impl Write) -> anyhow::Result<()> {
        let keys = self.store.list().await.context("listing saved assessments")?;
        display::print_keys(out, &keys)?;
        Ok(())
    }

    pub async fn show(&self, out: &mut impl Write, selector: &Selector) -> anyhow::Result<()> {
        let (target, prior) = self.select(selector).await?;
        let Some(record) = prior else {
            writeln!(
                out,
                "nenhuma avaliação salva para {}",
                derive_key(&target.entity_name, target.entity_type)
            )?;
            return Ok(());
        };
        let form = self.form(record.entity_type, Some(&record));
        display::print_form(
            out,
            &format!("{} ({})", record.entity_name, record.entity_type),
            &form,
            false,
        )?;
        display::print_record_header(out, &record)?;
        Ok(())
    }

    pub async fn fill(
        &self,
        input: impl BufRead,
        out: &mut impl Write,
        selector: &Selector,
    ) -> anyhow::Result<()> {
        let (target, prior) = self.select(selector).await?;
        let name = target.entity_name()?;
        let mut form = self.form(target.entity_type, prior.as_ref());

        let completed = Prompter::new(input, &mut *out).fill(&mut form)?;
        if !completed {
            bail!("input ended before the last question; nothing was saved");
        }

        let record = form.to_record(name, target.entity_type);
        let receipt = self.save(&record).await?;
        writeln!(out, "\nAvaliação salva em {}", receipt.location)?;
        Ok(())
    }

    pub async fn set(&self, out: &mut impl Write, target: &Target, edit: &Edit) -> anyhow::Result<()> {
        let name = target.entity_name()?;
        if edit.status.is_none() && edit.note.is_none() {
            bail!("nothing to change: pass --status and/or --obs");
        }
        let prior = self.prior(name, target.entity_type).await?;
        let mut form = self.form(target.entity_type, prior.as_ref());

        if let Some(status) = edit.status {
            form.set_status(&edit.topic, &edit.question, &edit.criterion, status)?;
        }
        if let Some(note) = &edit.note {
            form.set_note(&edit.topic, &edit.question, &edit.criterion, note.as_str())?;
        }

        let record = form.to_record(name, target.entity_type);
        let receipt = self.save(&record).await?;
        let question = form
            .question(&edit.topic, &edit.question)
            .context("edited question vanished from the form")?;
        display::print_question(out, question, false)?;
        writeln!(out, "\nAvaliação salva em {}", receipt.location)?;
        Ok(())
    }

    /// Save the current assessment, then write its PDF report.
    pub async fn report(&self, out: &mut impl Write, target: &Target) -> anyhow::Result<()> {
        let name = target.entity_name()?;
        let prior = self.prior(name, target.entity_type).await?;
        if prior.is_none() {
            warn!(
                key = %derive_key(name, target.entity_type),
                "no saved assessment; reporting on an empty one"
            );
        }
        let record = self
            .form(target.entity_type, prior.as_ref())
            .to_record(name, target.entity_type);
        let receipt = self.save(&record).await?;

        let report = pntp_report::generate(&record).context("generating report")?;
        let dir = &self.config.reports_dir;
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;
        let path = dir.join(&report.file_name);
        tokio::fs::write(&path, &report.bytes)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), key = %receipt.key, "wrote report");

        writeln!(out, "Avaliação salva em {}", receipt.location)?;
        writeln!(
            out,
            "Relatório: {} ({} critério(s) não atendido(s))",
            path.display(),
            report.layout.criterion_count()
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use pntp_core::CriterionAnswer;
    use pntp_store::LocalStore;
    use std::io::Cursor;
    use std::path::Path;
    use tempfile::TempDir;

    const CATALOG: &str = r#"{
        "Câmara": {
            "Acesso à Informação": {
                "Publicação de Atas": {"Disponibilidade": {}, "Formato": {}, "Tempestividade": {}}
            }
        },
        "Prefeitura": {
            "Receitas": {
                "Arrecadação": {"Disponibilidade": {}}
            }
        }
    }"#;

    const TOPIC: &str = "Acesso à Informação";
    const ATAS: &str = "Publicação de Atas";

    fn app(dir: &Path, strict: bool) -> App {
        let data_dir = dir.join("avaliacoes");
        let config = AppConfig {
            criteria_path: dir.join("criterios.json"),
            explanations_path: dir.join("explicacoes.json"),
            reports_dir: dir.join("relatorios"),
            strict,
            store: StoreConfig::Local {
                data_dir: data_dir.clone(),
            },
        };
        App::with_parts(
            config,
            CriteriaCatalog::from_json(CATALOG).unwrap(),
            ExplanationCatalog::default(),
            Box::new(LocalStore::new(data_dir)),
        )
    }

    fn target(name: &str) -> Target {
        Target {
            entity_name: name.to_string(),
            entity_type: EntityType::Legislative,
        }
    }

    fn by_name(name: &str) -> Selector {
        Selector {
            key: None,
            entity_name: Some(name.to_string()),
            entity_type: Some(EntityType::Legislative),
        }
    }

    fn by_key(key: &str) -> Selector {
        Selector {
            key: Some(key.to_string()),
            entity_name: None,
            entity_type: None,
        }
    }

    fn edit(criterion: &str, status: Option<Status>, note: Option<&str>) -> Edit {
        Edit {
            topic: TOPIC.into(),
            question: ATAS.into(),
            criterion: criterion.into(),
            status,
            note: note.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn set_cascades_and_persists() {
        let dir = TempDir::new().unwrap();
        let app = app(dir.path(), false);
        let mut out = Vec::new();

        app.set(&mut out, &target("Olinda"), &edit("Formato", Some(Status::NonCompliant), Some("PDF")))
            .await
            .unwrap();
        app.set(
            &mut out,
            &target(" Olinda "),
            &edit("Disponibilidade", Some(Status::NonCompliant), None),
        )
        .await
        .unwrap();

        let saved = app
            .store
            .load("Olinda", EntityType::Legislative)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(saved.entity_name, "Olinda");
        assert_eq!(saved.answer(TOPIC, ATAS, "Formato"), Some(&CriterionAnswer::non_compliant()));
        assert_eq!(saved.non_compliant_count(), 3);

        let locked = app
            .set(&mut out, &target("Olinda"), &edit("Formato", Some(Status::Compliant), None))
            .await;
        assert!(locked.is_err());
    }

    #[tokio::test]
    async fn empty_name_is_rejected_before_writing() {
        let dir = TempDir::new().unwrap();
        let app = app(dir.path(), false);
        let mut out = Vec::new();

        let err = app.report(&mut out, &target("   ")).await.unwrap_err();
        assert!(err.downcast_ref::<ValidationError>().is_some());
        assert!(!dir.path().join("avaliacoes").exists());
        assert!(!dir.path().join("relatorios").exists());
    }

    #[tokio::test]
    async fn report_saves_and_writes_pdf() {
        let dir = TempDir::new().unwrap();
        let app = app(dir.path(), false);
        let mut out = Vec::new();

        app.set(
            &mut out,
            &target("São Paulo"),
            &edit("Disponibilidade", Some(Status::NonCompliant), None),
        )
        .await
        .unwrap();
        app.report(&mut out, &target("São Paulo")).await.unwrap();

        let pdf = dir.path().join("relatorios").join("São_Paulo_Câmara_relatorio.pdf");
        let bytes = std::fs::read(pdf).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("(3 critério(s) não atendido(s))"));
        assert!(dir.path().join("avaliacoes").join("são_paulo_câmara.json").exists());
    }

    #[tokio::test]
    async fn corrupt_record_is_ignored_unless_strict() {
        let dir = TempDir::new().unwrap();
        let data_dir = dir.path().join("avaliacoes");
        std::fs::create_dir_all(&data_dir).unwrap();
        std::fs::write(data_dir.join("olinda_câmara.json"), "{ not json").unwrap();
        let mut out = Vec::new();

        let strict = app(dir.path(), true);
        assert!(strict.report(&mut out, &target("Olinda")).await.is_err());

        let lenient = app(dir.path(), false);
        lenient.report(&mut out, &target("Olinda")).await.unwrap();
        let repaired = lenient
            .store
            .load("Olinda", EntityType::Legislative)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(repaired.non_compliant_count(), 0);
    }

    #[tokio::test]
    async fn fill_walks_the_questionnaire_and_saves() {
        let dir = TempDir::new().unwrap();
        let app = app(dir.path(), false);
        let mut out = Vec::new();

        // Disponibilidade: Não Atende, no note; siblings are skipped.
        app.fill(Cursor::new("n\n\n"), &mut out, &by_name("Recife"))
            .await
            .unwrap();
        let saved = app
            .store
            .load("Recife", EntityType::Legislative)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(saved.non_compliant_count(), 3);

        let err = app
            .fill(Cursor::new(""), &mut out, &by_name("Recife"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("nothing was saved"));
    }

    #[tokio::test]
    async fn show_and_list_print_saved_assessments() {
        let dir = TempDir::new().unwrap();
        let app = app(dir.path(), false);
        let mut out = Vec::new();

        app.show(&mut out, &by_name("Olinda")).await.unwrap();
        app.set(&mut out, &target("Olinda"), &edit("Tempestividade", None, Some("atrasada")))
            .await
            .unwrap();
        out.clear();

        app.show(&mut out, &by_name("Olinda")).await.unwrap();
        app.list(&mut out).await.unwrap();
        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("=== Olinda (Câmara) ==="));
        assert!(printed.contains("Tempestividade             Atende | Obs: atrasada"));
        assert!(printed.contains("olinda_câmara\n"));
    }

    #[tokio::test]
    async fn saved_key_from_list_reopens_the_assessment() {
        let dir = TempDir::new().unwrap();
        let app = app(dir.path(), false);
        let mut out = Vec::new();
        app.set(&mut out, &target(" São Paulo "), &edit("Formato", Some(Status::NonCompliant), None))
            .await
            .unwrap();
        let keys = app.store.list().await.unwrap();
        assert_eq!(keys, vec!["são_paulo_câmara"]);

        out.clear();
        app.show(&mut out, &by_key(&keys[0])).await.unwrap();
        let printed = String::from_utf8(out.clone()).unwrap();
        assert!(printed.contains("=== São Paulo (Câmara) ==="));

        // Resume: keep every answer, then flag Tempestividade.
        app.fill(Cursor::new("\n\n\n\nn\natrasada\n"), &mut out, &by_key(&keys[0]))
            .await
            .unwrap();
        let saved = app.store.load_key(&keys[0]).await.unwrap().unwrap();
        assert_eq!(saved.entity_name, "São Paulo");
        assert_eq!(saved.answer(TOPIC, ATAS, "Formato"), Some(&CriterionAnswer::non_compliant()));
        assert_eq!(saved.answer(TOPIC, ATAS, "Tempestividade").unwrap().note, "atrasada");

        let err = app.show(&mut out, &by_key("recife_câmara")).await.unwrap_err();
        assert!(err.to_string().contains("no saved assessment under key"));
    }

    #[test]
    fn catalog_prints_each_entity_type() {
        let dir = TempDir::new().unwrap();
        let app = app(dir.path(), false);
        let mut out = Vec::new();
        app.catalog(&mut out, EntityType::Executive).unwrap();
        let printed = String::from_utf8(out).unwrap();
        assert!(printed.starts_with("=== Prefeitura ==="));
        assert!(printed.contains("Arrecadação"));
        assert!(!printed.contains("Publicação de Atas"));
    }
}
