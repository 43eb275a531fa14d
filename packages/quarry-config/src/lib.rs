mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, OpenAlexConfig, Postgres, Retrievers, Search, Service, Storage, WebSearchConfig,
};

use std::{fs, path::Path};

pub const OPENALEX_MAX_PER_PAGE: u32 = 200;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.search.default_retrievers.is_empty() {
		return Err(Error::Validation {
			message: "search.default_retrievers must be non-empty.".to_string(),
		});
	}
	if cfg.search.default_retrievers.iter().any(|name| name.is_empty()) {
		return Err(Error::Validation {
			message: "search.default_retrievers must not contain blank names.".to_string(),
		});
	}
	if cfg.search.default_target == 0 {
		return Err(Error::Validation {
			message: "search.default_target must be greater than zero.".to_string(),
		});
	}
	if cfg.search.default_max_results == 0 {
		return Err(Error::Validation {
			message: "search.default_max_results must be greater than zero.".to_string(),
		});
	}

	for (name, cap) in &cfg.search.max_results_per_retriever {
		if *cap == 0 {
			return Err(Error::Validation {
				message: format!(
					"search.max_results_per_retriever.{name} must be greater than zero."
				),
			});
		}
	}

	if cfg.search.default_language.is_empty() {
		return Err(Error::Validation {
			message: "search.default_language must be non-empty.".to_string(),
		});
	}

	if let Some(openalex) = cfg.retrievers.openalex.as_ref() {
		if openalex.api_base.trim().is_empty() {
			return Err(Error::Validation {
				message: "retrievers.openalex.api_base must be non-empty.".to_string(),
			});
		}
		if openalex.timeout_ms == 0 {
			return Err(Error::Validation {
				message: "retrievers.openalex.timeout_ms must be greater than zero.".to_string(),
			});
		}
		if !(1..=OPENALEX_MAX_PER_PAGE).contains(&openalex.max_per_page) {
			return Err(Error::Validation {
				message: format!(
					"retrievers.openalex.max_per_page must be in the range 1-{OPENALEX_MAX_PER_PAGE}."
				),
			});
		}
	}
	if let Some(web) = cfg.retrievers.web.as_ref() {
		for (label, value) in [
			("retrievers.web.api_base", &web.api_base),
			("retrievers.web.api_key", &web.api_key),
			("retrievers.web.path", &web.path),
		] {
			if value.trim().is_empty() {
				return Err(Error::Validation { message: format!("{label} must be non-empty.") });
			}
		}

		if web.timeout_ms == 0 {
			return Err(Error::Validation {
				message: "retrievers.web.timeout_ms must be greater than zero.".to_string(),
			});
		}
		if web.default_headers.values().any(|value| !value.is_string()) {
			return Err(Error::Validation {
				message: "retrievers.web.default_headers values must be strings.".to_string(),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	for name in cfg.search.default_retrievers.iter_mut() {
		*name = name.trim().to_string();
	}

	cfg.search.default_language = cfg.search.default_language.trim().to_string();

	if let Some(openalex) = cfg.retrievers.openalex.as_mut()
		&& openalex.api_key.as_deref().map(|key| key.trim().is_empty()).unwrap_or(false)
	{
		openalex.api_key = None;
	}
}
