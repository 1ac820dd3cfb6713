//! Plan orchestration
//!
//! A plan is four LLM sub-tasks: `summary`, `hotels` and `places` only need
//! the request and run concurrently; `costs` prices the chosen hotels and
//! places and therefore runs after them. The whole plan is bounded by a
//! deadline; when it expires the outstanding calls are dropped and no partial
//! plan is returned.

use chrono::Utc;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use crate::config::PlanningConfig;
use crate::llm::{LlmClient, extract_json};
use crate::models::{
    CostCategory, CostEstimate, HotelSuggestion, PlaceSuggestion, TripPlan, TripRequest,
};
use crate::prompt::{PlanStep, PromptBuilder};
use crate::{PlannerError, Result};

/// Answer of the `summary` step
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TripSummary {
    pub summary: String,
    #[serde(default)]
    pub considerations: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct HotelsAnswer {
    hotels: Vec<HotelSuggestion>,
}

#[derive(Debug, Deserialize)]
struct PlacesAnswer {
    places: Vec<PlaceSuggestion>,
}

#[derive(Debug, Deserialize)]
struct CostsAnswer {
    breakdown: BTreeMap<String, Value>,
    #[serde(default)]
    total: Option<Value>,
    #[serde(default)]
    notes: Option<String>,
}

/// Sequences the LLM sub-tasks and assembles their answers into a [`TripPlan`]
pub struct PlanOrchestrator {
    llm: Arc<dyn LlmClient>,
    prompts: PromptBuilder,
    currency: String,
    timeout: Duration,
}

impl PlanOrchestrator {
    pub fn new(llm: Arc<dyn LlmClient>, config: &PlanningConfig) -> Result<Self> {
        Ok(Self {
            llm,
            prompts: PromptBuilder::new(config)?,
            currency: config.currency.clone(),
            timeout: config.request_timeout(),
        })
    }

    /// Override the planning deadline
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn prompts(&self) -> &PromptBuilder {
        &self.prompts
    }

    /// Produce a complete plan or fail; never returns a partial plan
    #[instrument(
        skip_all,
        fields(destination = %request.destination(), days = request.duration_days())
    )]
    pub async fn plan(&self, request: &TripRequest) -> Result<TripPlan> {
        let start_time = Instant::now();

        let plan = tokio::time::timeout(self.timeout, self.assemble(request))
            .await
            .map_err(|_| {
                warn!(
                    "Planning exceeded the {:?} deadline, abandoning outstanding steps",
                    self.timeout
                );
                PlannerError::timeout(self.timeout)
            })??;

        info!(
            "Planned {} hotels and {} places in {:.3}s",
            plan.hotels.len(),
            plan.places.len(),
            start_time.elapsed().as_secs_f64()
        );
        Ok(plan)
    }

    async fn assemble(&self, request: &TripRequest) -> Result<TripPlan> {
        let (summary, hotels, places) = futures::try_join!(
            self.run_summary(request),
            self.run_hotels(request),
            self.run_places(request),
        )?;

        let cost_estimate = self.run_costs(request, &hotels, &places).await?;

        Ok(TripPlan {
            summary: summary.summary,
            considerations: summary.considerations,
            hotels,
            places,
            cost_estimate,
            model: self.llm.model().to_string(),
            generated_at: Utc::now(),
        })
    }

    /// Profile the trip
    pub async fn run_summary(&self, request: &TripRequest) -> Result<TripSummary> {
        let prompt = self.prompts.summary(request)?;
        let mut answer: TripSummary = self.ask(PlanStep::Summary, &prompt).await?;

        answer.summary = answer.summary.trim().to_string();
        if answer.summary.is_empty() {
            return Err(PlannerError::malformed(PlanStep::Summary.name(), "summary is empty"));
        }
        answer.considerations.retain(|c| !c.trim().is_empty());
        Ok(answer)
    }

    /// Suggest accommodation
    pub async fn run_hotels(&self, request: &TripRequest) -> Result<Vec<HotelSuggestion>> {
        let prompt = self.prompts.hotels(request)?;
        let answer: HotelsAnswer = self.ask(PlanStep::Hotels, &prompt).await?;

        if answer.hotels.is_empty() {
            return Err(PlannerError::malformed(PlanStep::Hotels.name(), "no hotels suggested"));
        }
        if answer.hotels.iter().any(|h| h.name.trim().is_empty()) {
            return Err(PlannerError::malformed(PlanStep::Hotels.name(), "hotel without a name"));
        }
        Ok(answer.hotels)
    }

    /// Suggest places to visit
    pub async fn run_places(&self, request: &TripRequest) -> Result<Vec<PlaceSuggestion>> {
        let prompt = self.prompts.places(request)?;
        let answer: PlacesAnswer = self.ask(PlanStep::Places, &prompt).await?;

        if answer.places.is_empty() {
            return Err(PlannerError::malformed(PlanStep::Places.name(), "no places suggested"));
        }
        if answer.places.iter().any(|p| p.name.trim().is_empty()) {
            return Err(PlannerError::malformed(PlanStep::Places.name(), "place without a name"));
        }
        Ok(answer.places)
    }

    /// Estimate costs for the chosen hotels and places
    ///
    /// The total is computed from the breakdown; a total stated by the model
    /// is only compared against it.
    pub async fn run_costs(
        &self,
        request: &TripRequest,
        hotels: &[HotelSuggestion],
        places: &[PlaceSuggestion],
    ) -> Result<CostEstimate> {
        let step = PlanStep::Costs.name();
        let prompt = self.prompts.costs(request, hotels, places)?;
        let answer: CostsAnswer = self.ask(PlanStep::Costs, &prompt).await?;

        let mut breakdown = BTreeMap::new();
        for (key, value) in &answer.breakdown {
            let category: CostCategory = key
                .parse()
                .map_err(|message: String| PlannerError::malformed(step, message))?;
            let amount = parse_amount(value).ok_or_else(|| {
                PlannerError::malformed(step, format!("{key} amount {value} is not a number"))
            })?;
            if breakdown.insert(category, amount).is_some() {
                return Err(PlannerError::malformed(
                    step,
                    format!("{category} appears more than once"),
                ));
            }
        }

        let estimate = CostEstimate::new(breakdown, self.currency.clone(), request.budget())?;

        if let Some(stated) = answer.total.as_ref().and_then(parse_amount) {
            if (stated - estimate.total()).abs() > 0.5 {
                warn!(
                    "Model stated a total of {} but the breakdown sums to {}, using the sum",
                    stated,
                    estimate.total()
                );
            }
        }
        if let Some(notes) = &answer.notes {
            debug!("Cost notes: {}", notes);
        }

        Ok(estimate)
    }

    async fn ask<T: DeserializeOwned>(&self, step: PlanStep, prompt: &str) -> Result<T> {
        debug!("Running {} step ({} chars)", step, prompt.len());
        let start_time = Instant::now();

        let answer = self.llm.generate(prompt).await.map_err(|e| match e {
            PlannerError::MalformedResponse { message, .. } => {
                PlannerError::malformed(step.name(), message)
            }
            other => other,
        })?;

        let json = extract_json(&answer).ok_or_else(|| {
            PlannerError::malformed(step.name(), "answer contains no JSON object")
        })?;
        let parsed = serde_json::from_str(json)
            .map_err(|e| PlannerError::malformed(step.name(), e.to_string()))?;

        debug!(
            "{} step finished in {:.3}s",
            step,
            start_time.elapsed().as_secs_f64()
        );
        Ok(parsed)
    }
}

/// Numbers, or numeric strings such as "1,200" that models sometimes emit
fn parse_amount(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{InputCollector, TripInput};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SUMMARY: &str = r#"{"summary":"Five relaxed days of art and food in Paris.","considerations":["Museums close on Mondays"]}"#;
    const HOTELS: &str = r#"```json
{"hotels":[{"name":"Hotel Lutetia","price_range":"150-180 EUR/night","price_per_night":160,"total_cost":800,"rationale":"Left bank, walkable to museums"}]}
```"#;
    const PLACES: &str = r#"{"places":[{"name":"Louvre","category":"art","rationale":"World-class collection"},{"name":"Marché des Enfants Rouges","category":"food","reason":"Oldest covered market"}]}"#;
    const COSTS: &str = r#"{"breakdown":{"lodging":800,"food":"350","transport":120.5,"entry tickets":90,"misc":50},"total":1000,"notes":"Fits the budget"}"#;

    /// Answers by recognising which step a prompt belongs to
    struct ScriptedLlm {
        costs: &'static str,
        calls: AtomicUsize,
    }

    impl ScriptedLlm {
        fn new() -> Self {
            Self::with_costs(COSTS)
        }

        fn with_costs(costs: &'static str) -> Self {
            Self {
                costs,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        fn model(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let answer = if prompt.contains("Estimate the total travel cost") {
                self.costs
            } else if prompt.contains("accommodation options") {
                HOTELS
            } else if prompt.contains("must-visit places") {
                PLACES
            } else {
                SUMMARY
            };
            Ok(answer.to_string())
        }
    }

    struct SlowLlm;

    #[async_trait]
    impl LlmClient for SlowLlm {
        fn model(&self) -> &str {
            "slow"
        }

        async fn generate(&self, _prompt: &str) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(SUMMARY.to_string())
        }
    }

    /// Holds every independent step until all three are in flight
    struct BarrierLlm {
        barrier: tokio::sync::Barrier,
        inner: ScriptedLlm,
    }

    #[async_trait]
    impl LlmClient for BarrierLlm {
        fn model(&self) -> &str {
            "barrier"
        }

        async fn generate(&self, prompt: &str) -> Result<String> {
            if !prompt.contains("Estimate the total travel cost") {
                self.barrier.wait().await;
            }
            self.inner.generate(prompt).await
        }
    }

    fn paris() -> TripRequest {
        InputCollector::new(60)
            .collect(TripInput {
                destination: Some("Paris".to_string()),
                area: None,
                budget: Some(serde_json::json!(2000.0)),
                duration_days: Some(serde_json::json!(5)),
                travel_type: Some("leisure".to_string()),
                interests: vec!["art".to_string(), "food".to_string()],
            })
            .unwrap()
    }

    fn config() -> PlanningConfig {
        PlanningConfig {
            currency: "EUR".to_string(),
            ..PlanningConfig::default()
        }
    }

    #[tokio::test]
    async fn test_assembles_full_plan() {
        let llm = Arc::new(ScriptedLlm::new());
        let orchestrator = PlanOrchestrator::new(llm.clone(), &config()).unwrap();

        let plan = orchestrator.plan(&paris()).await.unwrap();

        assert_eq!(llm.calls.load(Ordering::SeqCst), 4);
        assert!(plan.summary.starts_with("Five relaxed days"));
        assert_eq!(plan.considerations, ["Museums close on Mondays"]);
        assert_eq!(plan.hotels[0].name, "Hotel Lutetia");
        assert_eq!(plan.hotels[0].total_cost, Some(800.0));
        assert_eq!(plan.places.len(), 2);
        assert_eq!(plan.places[1].rationale, "Oldest covered market");
        assert_eq!(plan.model, "scripted");

        let costs = &plan.cost_estimate;
        assert_eq!(costs.total(), 1410.5);
        assert!(costs.is_consistent());
        assert!(costs.within_budget());
        assert_eq!(costs.currency(), "EUR");
        assert_eq!(costs.amount(CostCategory::Activities), Some(90.0));
    }

    #[tokio::test]
    async fn test_independent_steps_run_concurrently() {
        let llm = Arc::new(BarrierLlm {
            barrier: tokio::sync::Barrier::new(3),
            inner: ScriptedLlm::new(),
        });
        let orchestrator = PlanOrchestrator::new(llm, &config())
            .unwrap()
            .with_timeout(Duration::from_secs(5));

        assert!(orchestrator.plan(&paris()).await.is_ok());
    }

    #[tokio::test]
    async fn test_deadline_yields_timeout() {
        let orchestrator = PlanOrchestrator::new(Arc::new(SlowLlm), &config())
            .unwrap()
            .with_timeout(Duration::from_millis(50));

        let err = orchestrator.plan(&paris()).await.unwrap_err();
        assert!(matches!(err, PlannerError::Timeout { millis: 50 }));
    }

    #[tokio::test]
    async fn test_unknown_cost_category_is_malformed() {
        let llm = Arc::new(ScriptedLlm::with_costs(r#"{"breakdown":{"souvenirs":100}}"#));
        let orchestrator = PlanOrchestrator::new(llm, &config()).unwrap();

        let err = orchestrator.plan(&paris()).await.unwrap_err();
        assert!(matches!(err, PlannerError::MalformedResponse { ref step, .. } if step == "costs"));
    }

    #[tokio::test]
    async fn test_duplicate_cost_category_is_malformed() {
        let llm = Arc::new(ScriptedLlm::with_costs(
            r#"{"breakdown":{"lodging":100,"hotel stay":100}}"#,
        ));
        let orchestrator = PlanOrchestrator::new(llm, &config()).unwrap();

        let err = orchestrator.plan(&paris()).await.unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[tokio::test]
    async fn test_prose_answer_is_malformed() {
        let llm = Arc::new(ScriptedLlm::with_costs("It will cost about 1500 euros."));
        let orchestrator = PlanOrchestrator::new(llm, &config()).unwrap();

        let err = orchestrator.plan(&paris()).await.unwrap_err();
        assert!(matches!(err, PlannerError::MalformedResponse { ref step, .. } if step == "costs"));
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount(&serde_json::json!(12.5)), Some(12.5));
        assert_eq!(parse_amount(&serde_json::json!("1,200")), Some(1200.0));
        assert_eq!(parse_amount(&serde_json::json!("lots")), None);
        assert_eq!(parse_amount(&serde_json::json!(null)), None);
    }
}
