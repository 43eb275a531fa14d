//! Built-in retrievers backed by the HTTP clients in `quarry-providers`.

use quarry_config::{OpenAlexConfig, WebSearchConfig};
use quarry_domain::{compile::QuerySyntax, plan::QueryStep, unit::KnowledgeUnit};
use quarry_providers::{
	openalex::{self, WorkContext, WorksRequest},
	web::{self, PageContext, WebSearchRequest},
};

use crate::{BoxFuture, Result, Retriever, RetrieverContext};

pub struct OpenAlexRetriever {
	cfg: OpenAlexConfig,
}
impl OpenAlexRetriever {
	pub fn new(cfg: OpenAlexConfig) -> Self {
		Self { cfg }
	}

	async fn run(&self, step: &QueryStep, ctx: &RetrieverContext<'_>) -> Result<Vec<KnowledgeUnit>> {
		let request = WorksRequest {
			search: step.compiled(),
			per_page: step.max_results.min(self.cfg.max_per_page),
			page: 1,
			from_date: ctx.time_slice.map(|slice| slice.from.date()),
			to_date: ctx.time_slice.map(|slice| slice.to.date()),
		};
		let json = openalex::search_works(&self.cfg, &request).await?;
		let work_ctx = WorkContext {
			topic_id: ctx.topic_id,
			run_id: ctx.run_id,
			compiled_query: step.compiled(),
			language: step.language.as_deref(),
			require_abstract: self.cfg.require_abstract,
		};
		let mut units = openalex::parse_works(&json, &work_ctx)?;

		units.truncate(step.max_results as usize);

		Ok(units)
	}
}
impl Retriever for OpenAlexRetriever {
	fn name(&self) -> &str {
		openalex::SOURCE_SYSTEM
	}

	fn syntax(&self) -> QuerySyntax {
		QuerySyntax::Boolean
	}

	fn retrieve<'a>(
		&'a self,
		step: &'a QueryStep,
		ctx: &'a RetrieverContext<'a>,
	) -> BoxFuture<'a, Result<Vec<KnowledgeUnit>>> {
		Box::pin(self.run(step, ctx))
	}
}

pub struct WebRetriever {
	cfg: WebSearchConfig,
	/// Sent when the step has no language; the endpoint requires one.
	default_language: String,
}
impl WebRetriever {
	pub fn new(cfg: WebSearchConfig, default_language: String) -> Self {
		Self { cfg, default_language }
	}

	async fn run(&self, step: &QueryStep, ctx: &RetrieverContext<'_>) -> Result<Vec<KnowledgeUnit>> {
		let language = step.language.as_deref().unwrap_or(&self.default_language);
		let request = WebSearchRequest {
			query: step.compiled(),
			limit: step.max_results,
			language: Some(language),
		};
		let json = web::search(&self.cfg, &request).await?;
		let page_ctx = PageContext {
			topic_id: ctx.topic_id,
			run_id: ctx.run_id,
			compiled_query: step.compiled(),
			language: Some(language),
		};
		let mut units = web::parse_results(&json, &page_ctx)?;

		units.truncate(step.max_results as usize);

		Ok(units)
	}
}
impl Retriever for WebRetriever {
	fn name(&self) -> &str {
		web::SOURCE_SYSTEM
	}

	fn syntax(&self) -> QuerySyntax {
		QuerySyntax::TokenPrefix
	}

	fn retrieve<'a>(
		&'a self,
		step: &'a QueryStep,
		ctx: &'a RetrieverContext<'a>,
	) -> BoxFuture<'a, Result<Vec<KnowledgeUnit>>> {
		Box::pin(self.run(step, ctx))
	}
}
