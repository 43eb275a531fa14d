pub mod error;

pub use error::{Error, Result};

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use serde::Serialize;
use time::{
	Date, OffsetDateTime, Time, format_description::well_known::Rfc3339,
	macros::format_description,
};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use quarry_domain::plan::{PlanMode, SearchPlan, StepResult, TimeSlice};
use quarry_service::{CollectRequest, CollectResult, IngestReport, QuarryService, SearchQuery};
use quarry_storage::db::Db;

#[derive(Debug, Parser)]
#[command(
	version = quarry_cli::VERSION,
	rename_all = "kebab",
	styles = quarry_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[arg(long, short = 't', value_name = "UUID")]
	pub topic: Uuid,
	/// Start of the time slice, `YYYY-MM-DD` or RFC 3339.
	#[arg(long, value_name = "DATE", value_parser = parse_from)]
	pub from: Option<OffsetDateTime>,
	/// End of the time slice, inclusive. A bare date covers the whole day.
	#[arg(long, value_name = "DATE", value_parser = parse_to)]
	pub to: Option<OffsetDateTime>,
	#[arg(long, value_name = "N")]
	pub target: Option<u32>,
	#[arg(long, value_name = "UUID")]
	pub run_id: Option<Uuid>,
	/// `discovery` or `monitoring`; anything else plans as discovery.
	#[arg(long, default_value = "discovery")]
	pub mode: String,
	/// Collect and report without persisting.
	#[arg(long)]
	pub dry_run: bool,
	/// Free-text flat query, used when no `--keyword` is given.
	#[arg(long, value_name = "TEXT")]
	pub text: Option<String>,
	/// Flat keyword query. When given, the topic's stored definitions are not used.
	#[arg(long = "keyword", value_name = "TERM")]
	pub keywords: Vec<String>,
	#[arg(long = "must", value_name = "TERM")]
	pub must_have: Vec<String>,
	#[arg(long = "exclude", value_name = "TERM")]
	pub exclude: Vec<String>,
	#[arg(long, value_name = "LANG")]
	pub language: Option<String>,
}
impl Args {
	pub fn collect_request(&self) -> Result<CollectRequest> {
		let time_slice = match (self.from, self.to) {
			(None, None) => None,
			(Some(from), Some(to)) => Some(TimeSlice { from, to }),
			_ => {
				return Err(Error::Validation(
					"--from and --to must be given together.".to_string(),
				));
			},
		};

		Ok(CollectRequest {
			topic_id: self.topic,
			run_id: Some(self.run_id.unwrap_or_else(Uuid::new_v4)),
			target: self.target,
			time_slice,
			mode: PlanMode::parse_lenient(&self.mode),
		})
	}

	/// A dry run only reads topics, so it neither migrates the schema nor ingests.
	pub fn writes_storage(&self) -> bool {
		!self.dry_run
	}

	pub fn legacy_query(&self) -> Option<SearchQuery> {
		if self.text.is_none() && self.keywords.is_empty() && self.must_have.is_empty() {
			return None;
		}

		Some(SearchQuery {
			text: self.text.clone(),
			keywords: self.keywords.clone(),
			must_have: self.must_have.clone(),
			exclude: self.exclude.clone(),
			language: self.language.clone(),
			target: self.target,
			enabled_retrievers: None,
		})
	}
}

/// What a run printed to stdout.
#[derive(Debug, Serialize)]
pub struct RunReport {
	pub topic_id: Uuid,
	pub run_id: Option<Uuid>,
	pub plan: SearchPlan,
	pub step_results: Vec<StepResult>,
	pub total_found: usize,
	pub total_returned: usize,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub ingest: Option<IngestReport>,
}
impl RunReport {
	fn new(request: &CollectRequest, result: CollectResult, ingest: Option<IngestReport>) -> Self {
		Self {
			topic_id: request.topic_id,
			run_id: request.run_id,
			plan: result.plan,
			step_results: result.step_results,
			total_found: result.total_found,
			total_returned: result.total_returned,
			ingest,
		}
	}
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = quarry_config::load(&args.config)?;
	let filter = EnvFilter::try_new(&config.service.log_level)
		.unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

	let db = Db::connect(&config.storage.postgres).await?;

	if args.writes_storage() {
		db.ensure_schema().await?;
	}

	let db = Arc::new(db);
	let service = QuarryService::new(config, db.clone(), db);
	let report = collect(&service, &args).await?;

	println!("{}", serde_json::to_string_pretty(&report)?);

	Ok(())
}

pub async fn collect(service: &QuarryService, args: &Args) -> Result<RunReport> {
	let request = args.collect_request()?;
	let result = match args.legacy_query() {
		Some(query) => service.collect_legacy(&request, &query).await?,
		None => service.collect(&request).await?,
	};

	tracing::info!(
		topic_id = %request.topic_id,
		steps = result.step_results.len(),
		total_returned = result.total_returned,
		dry_run = args.dry_run,
		"Collection finished."
	);

	let ingest =
		if args.writes_storage() { Some(service.ingest(&result.items).await) } else { None };

	Ok(RunReport::new(&request, result, ingest))
}

fn parse_from(raw: &str) -> Result<OffsetDateTime> {
	parse_bound(raw, Time::MIDNIGHT)
}

fn parse_to(raw: &str) -> Result<OffsetDateTime> {
	let end_of_day = Time::from_hms(23, 59, 59)
		.map_err(|err| Error::Validation(format!("Invalid end of day: {err}.")))?;

	parse_bound(raw, end_of_day)
}

fn parse_bound(raw: &str, time_of_day: Time) -> Result<OffsetDateTime> {
	let raw = raw.trim();

	if let Ok(at) = OffsetDateTime::parse(raw, &Rfc3339) {
		return Ok(at);
	}

	Date::parse(raw, format_description!("[year]-[month]-[day]"))
		.map(|date| date.with_time(time_of_day).assume_utc())
		.map_err(|_| Error::Validation(format!("{raw} is neither YYYY-MM-DD nor RFC 3339.")))
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use super::*;

	fn args(extra: &[&str]) -> Args {
		let topic = Uuid::nil().to_string();
		let mut argv = vec!["quarry-collector", "--config", "quarry.toml", "--topic", topic.as_str()];

		argv.extend_from_slice(extra);

		Args::try_parse_from(argv).expect("Failed to parse arguments.")
	}

	#[test]
	fn bare_dates_cover_whole_days() {
		let args = args(&["--from", "2024-01-01", "--to", "2024-01-31"]);
		let slice = args.collect_request().expect("request").time_slice.expect("slice");

		assert_eq!(slice.from, datetime!(2024-01-01 0:00 UTC));
		assert_eq!(slice.to, datetime!(2024-01-31 23:59:59 UTC));
	}

	#[test]
	fn half_open_slice_is_rejected() {
		assert!(args(&["--from", "2024-01-01"]).collect_request().is_err());
	}

	#[test]
	fn unknown_mode_plans_as_discovery() {
		let request = args(&["--mode", "backfill"]).collect_request().expect("request");

		assert_eq!(request.mode, PlanMode::Discovery);
		assert!(request.run_id.is_some());
	}

	#[test]
	fn dry_run_leaves_storage_untouched() {
		assert!(args(&[]).writes_storage());
		assert!(!args(&["--dry-run"]).writes_storage());
	}

	#[test]
	fn keywords_switch_to_flat_query() {
		assert!(args(&[]).legacy_query().is_none());

		let query = args(&["--keyword", "lithium", "--exclude", "mining", "--target", "5"])
			.legacy_query()
			.expect("query");

		assert_eq!(query.keywords, vec!["lithium".to_string()]);
		assert_eq!(query.exclude, vec!["mining".to_string()]);
		assert_eq!(query.target, Some(5));

		let query = args(&["--text", "sodium ion"]).legacy_query().expect("query");

		assert_eq!(query.text.as_deref(), Some("sodium ion"));
		assert!(query.keywords.is_empty());
	}
}
