use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use quarry_config::Config;

const SAMPLE_CONFIG_TEMPLATE_TOML: &str = include_str!("fixtures/sample_config.template.toml");

fn sample_toml_with_search(default_retrievers: &[&str], default_target: i64) -> String {
	let mut value: Value =
		toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.");
	let root = value.as_table_mut().expect("Template config must be a table.");
	let search = root
		.get_mut("search")
		.and_then(Value::as_table_mut)
		.expect("Template config must include [search].");

	search.insert(
		"default_retrievers".to_string(),
		Value::Array(
			default_retrievers.iter().map(|name| Value::String((*name).to_string())).collect(),
		),
	);
	search.insert("default_target".to_string(), Value::Integer(default_target));

	toml::to_string(&value).expect("Failed to render template config.")
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("quarry_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn base_config() -> Config {
	toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse test config.")
}

#[test]
fn template_config_loads() {
	let path = write_temp_config(SAMPLE_CONFIG_TEMPLATE_TOML.to_string());
	let result = quarry_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let cfg = result.expect("Expected template config to load.");

	assert_eq!(cfg.search.default_retrievers, vec!["openalex".to_string()]);
	assert_eq!(cfg.search.max_results_for("web"), 20);
	assert_eq!(cfg.search.max_results_for("unknown"), 50);
	// Blank api keys are normalized away.
	assert!(cfg.retrievers.openalex.as_ref().and_then(|o| o.api_key.as_ref()).is_none());
}

#[test]
fn default_retrievers_must_be_non_empty() {
	let path = write_temp_config(sample_toml_with_search(&[], 50));
	let result = quarry_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let err = result.expect_err("Expected default_retrievers validation error.");

	assert!(
		err.to_string().contains("search.default_retrievers must be non-empty."),
		"Unexpected error: {err}"
	);
}

#[test]
fn retriever_names_are_trimmed_before_validation() {
	let path = write_temp_config(sample_toml_with_search(&["  openalex ", "   "], 50));
	let result = quarry_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let err = result.expect_err("Expected blank retriever name validation error.");

	assert!(
		err.to_string().contains("search.default_retrievers must not contain blank names."),
		"Unexpected error: {err}"
	);
}

#[test]
fn default_target_must_be_positive() {
	let path = write_temp_config(sample_toml_with_search(&["openalex"], 0));
	let result = quarry_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let err = result.expect_err("Expected default_target validation error.");

	assert!(
		err.to_string().contains("search.default_target must be greater than zero."),
		"Unexpected error: {err}"
	);
}

#[test]
fn per_retriever_caps_must_be_positive() {
	let mut cfg = base_config();

	cfg.search.max_results_per_retriever.insert("web".to_string(), 0);

	let err = quarry_config::validate(&cfg).expect_err("Expected cap validation error.");

	assert!(
		err.to_string().contains("search.max_results_per_retriever.web must be greater than zero."),
		"Unexpected error: {err}"
	);
}

#[test]
fn openalex_page_size_is_bounded() {
	let mut cfg = base_config();

	if let Some(openalex) = cfg.retrievers.openalex.as_mut() {
		openalex.max_per_page = 500;
	}

	let err = quarry_config::validate(&cfg).expect_err("Expected page size validation error.");

	assert!(
		err.to_string().contains("retrievers.openalex.max_per_page must be in the range 1-200."),
		"Unexpected error: {err}"
	);
}

#[test]
fn web_headers_must_be_strings() {
	let mut cfg = base_config();

	if let Some(web) = cfg.retrievers.web.as_mut() {
		web.default_headers.insert("x-retries".to_string(), serde_json::json!(3));
	}

	let err = quarry_config::validate(&cfg).expect_err("Expected header validation error.");

	assert!(
		err.to_string().contains("retrievers.web.default_headers values must be strings."),
		"Unexpected error: {err}"
	);
}

#[test]
fn missing_file_reports_path() {
	let mut path = env::temp_dir();

	path.push("quarry_config_test_missing.toml");

	let err = quarry_config::load(&path).expect_err("Expected read error.");

	assert!(matches!(err, quarry_config::Error::ReadConfig { .. }));
}
