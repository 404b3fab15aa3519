use crate::infra::load_repository;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use wellscan::config::AppConfig;
use wellscan::error::AppError;
use wellscan::scan::{
    CategoryCode, InMemoryNutritionRepository, NutritionRepository, PipelineError, ProductCode,
    ScanResponse, SeedImporter, WellnessPipeline,
};

#[derive(Args, Debug)]
pub(crate) struct ScanArgs {
    /// Product code as printed under the barcode
    pub(crate) code: String,
    /// Food category load code the product is being sorted into
    #[arg(long)]
    pub(crate) category: String,
    /// Seed directory to load before scanning (defaults to SEED_DIR)
    #[arg(long)]
    pub(crate) seed_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct SeedCheckArgs {
    /// Directory holding categories.csv, nutrules.csv and optionally products.csv
    #[arg(long)]
    pub(crate) seed_dir: PathBuf,
}

pub(crate) async fn run_scan(args: ScanArgs) -> Result<(), AppError> {
    let ScanArgs {
        code,
        category,
        seed_dir,
    } = args;

    let config = AppConfig::load()?;
    let seed_dir = seed_dir.or(config.seed_dir);
    let repository = load_repository(seed_dir.as_deref())?;
    let pipeline = WellnessPipeline::new(repository, config.providers.sources()?);

    let result = pipeline
        .evaluate(&ProductCode(code), &CategoryCode(category))
        .await?;
    let rendered = serde_json::to_string_pretty(&ScanResponse::from(result))
        .map_err(std::io::Error::other)?;
    println!("{rendered}");
    Ok(())
}

pub(crate) fn run_seed_check(args: SeedCheckArgs) -> Result<(), AppError> {
    let repository = Arc::new(InMemoryNutritionRepository::default());
    let summary = SeedImporter::from_dir(&args.seed_dir, repository.as_ref())?;

    println!("Seed directory {}", args.seed_dir.display());
    println!(
        "- {} categories | {} rules | {} products",
        summary.categories, summary.rules, summary.products
    );

    for line in category_report(repository.as_ref())? {
        println!("  {line}");
    }
    Ok(())
}

fn category_report<R>(repository: &R) -> Result<Vec<String>, AppError>
where
    R: NutritionRepository,
{
    let mut lines = Vec::new();
    for category in repository.categories().map_err(PipelineError::from)? {
        let label = category
            .name
            .clone()
            .unwrap_or_else(|| category.code.to_string());
        let rule = repository
            .rule_for_category(&category.code)
            .map_err(PipelineError::from)?;
        let line = match rule {
            Some(rule) => format!(
                "{} ({}): {:?} {:?} '{}' -> well when {}",
                label, category.code, rule.field, rule.rule_type, rule.value, rule.wellness
            ),
            None => format!("{} ({}): no rule configured", label, category.code),
        };
        lines.push(line);
    }
    Ok(lines)
}
