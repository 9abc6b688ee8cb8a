//! Pattern detectors - per-domain running statistics
//!
//! One table row per user, agent, file, workflow and error type. Updates are
//! best effort: a row is only touched when its key field is present, and any
//! other missing field simply leaves the matching statistic alone.

use crate::observation::{AgentAction, CodeChange, ErrorEvent, UserMessage, WorkflowExecution};
use agentmesh_core::config::{LearningConfig, MemoryConfig};
use chrono::{DateTime, Timelike, Utc};
use regex::Regex;
use serde::{Serialize, Serializer};
use std::collections::VecDeque;
use std::fmt;
use std::sync::LazyLock;

static CURRENCY_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(\d+)").expect("currency pattern is valid"));

/// Query categories, in classification priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryCategory {
    BudgetQuestion,
    DestinationInquiry,
    PlanningRequest,
    CulturalQuestion,
    HelpRequest,
    General,
}

const CATEGORY_KEYWORDS: [(QueryCategory, &[&str]); 5] = [
    (QueryCategory::BudgetQuestion, &["budget", "cost", "price"]),
    (QueryCategory::DestinationInquiry, &["destination", "where", "recommend"]),
    (QueryCategory::PlanningRequest, &["plan", "itinerary", "schedule"]),
    (QueryCategory::CulturalQuestion, &["culture", "tradition", "custom"]),
    (QueryCategory::HelpRequest, &["help", "how"]),
];

impl QueryCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BudgetQuestion => "budget_question",
            Self::DestinationInquiry => "destination_inquiry",
            Self::PlanningRequest => "planning_request",
            Self::CulturalQuestion => "cultural_question",
            Self::HelpRequest => "help_request",
            Self::General => "general",
        }
    }
}

impl fmt::Display for QueryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First category whose keywords appear in the message wins.
pub fn classify_query(message: &str) -> QueryCategory {
    let lower = message.to_lowercase();
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
        .map(|(category, _)| *category)
        .unwrap_or(QueryCategory::General)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelStyle {
    Luxury,
    Budget,
    Adventure,
}

pub fn travel_style(message: &str) -> Option<TravelStyle> {
    let lower = message.to_lowercase();
    if lower.contains("luxury") {
        Some(TravelStyle::Luxury)
    } else if lower.contains("budget") || lower.contains("cheap") {
        Some(TravelStyle::Budget)
    } else if lower.contains("adventure") {
        Some(TravelStyle::Adventure)
    } else {
        None
    }
}

/// Every `$<digits>` amount in the message.
pub fn currency_amounts(message: &str) -> Vec<u64> {
    CURRENCY_AMOUNT
        .captures_iter(message)
        .filter_map(|c| c.get(1)?.as_str().parse().ok())
        .collect()
}

/// Counter table that remembers first-seen order, so ties resolve to the
/// earliest key.
#[derive(Debug, Clone, Default)]
pub struct FrequencyTable {
    entries: Vec<(String, u64)>,
}

impl FrequencyTable {
    pub fn increment(&mut self, key: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, count)) => *count += 1,
            None => self.entries.push((key.to_string(), 1)),
        }
    }

    pub fn get(&self, key: &str) -> u64 {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, c)| *c)
            .unwrap_or(0)
    }

    /// Key with the highest count.
    pub fn top(&self) -> Option<&str> {
        let mut best: Option<&(String, u64)> = None;
        for entry in &self.entries {
            if best.map_or(true, |b| entry.1 > b.1) {
                best = Some(entry);
            }
        }
        best.map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for FrequencyTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(k, v)| (k, v)))
    }
}

/// Detector thresholds and window sizes.
#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub alpha: f64,
    pub improvement_threshold: f64,
    pub bottleneck_ratio: f64,
    pub error_prone_changes: u64,
    pub error_prone_bug_fixes: u64,
    pub recurring_errors: u64,
    pub error_context_window: usize,
    pub max_hour_samples: usize,
    pub max_improvement_areas: usize,
}

impl DetectorSettings {
    pub fn from_config(memory: &MemoryConfig, learning: &LearningConfig) -> Self {
        Self {
            alpha: learning.detector_ema_alpha,
            improvement_threshold: learning.improvement_threshold,
            bottleneck_ratio: learning.bottleneck_ratio,
            error_prone_changes: learning.error_prone_changes,
            error_prone_bug_fixes: learning.error_prone_bug_fixes,
            recurring_errors: learning.min_occurrences as u64,
            error_context_window: memory.error_context_window,
            max_hour_samples: memory.max_hour_samples,
            max_improvement_areas: memory.max_improvement_areas,
        }
    }
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self::from_config(&MemoryConfig::default(), &LearningConfig::default())
    }
}

fn ema(current: f64, sample: f64, alpha: f64) -> f64 {
    (1.0 - alpha) * current + alpha * sample
}

fn push_capped<T>(queue: &mut VecDeque<T>, item: T, cap: usize) {
    queue.push_back(item);
    while queue.len() > cap {
        queue.pop_front();
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct Preferences {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub budget_range: Vec<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<TravelStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UserPattern {
    pub message_count: u64,
    pub common_queries: FrequencyTable,
    pub active_hours: VecDeque<u32>,
    pub preferences: Preferences,
}

impl UserPattern {
    pub fn record(&mut self, msg: &UserMessage, now: DateTime<Utc>, settings: &DetectorSettings) {
        self.message_count += 1;
        push_capped(&mut self.active_hours, now.hour(), settings.max_hour_samples);

        if let Some(text) = msg.message.as_deref() {
            self.common_queries.increment(classify_query(text).as_str());
            let amounts = currency_amounts(text);
            if !amounts.is_empty() {
                self.preferences.budget_range = amounts;
            }
            if let Some(style) = travel_style(text) {
                self.preferences.style = Some(style);
            }
        }
        if let Some(language) = &msg.language {
            self.preferences.language = Some(language.clone());
        }
    }
}

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ImprovementArea {
    pub area: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentPattern {
    pub action_count: u64,
    pub success_rate: f64,
    pub average_latency_ms: f64,
    pub common_actions: FrequencyTable,
    pub improvement_areas: VecDeque<ImprovementArea>,
}

impl Default for AgentPattern {
    fn default() -> Self {
        Self {
            action_count: 0,
            success_rate: 1.0,
            average_latency_ms: 0.0,
            common_actions: FrequencyTable::default(),
            improvement_areas: VecDeque::new(),
        }
    }
}

impl AgentPattern {
    pub fn record(&mut self, action: &AgentAction, now: DateTime<Utc>, settings: &DetectorSettings) {
        self.action_count += 1;
        if let Some(name) = action.action.as_deref() {
            self.common_actions.increment(name);
        }
        if let Some(success) = action.success {
            let sample = if success { 1.0 } else { 0.0 };
            self.success_rate = ema(self.success_rate, sample, settings.alpha);
        }
        if let Some(latency) = action.latency_ms {
            self.average_latency_ms = ema(self.average_latency_ms, latency, settings.alpha);
        }
        if self.success_rate < settings.improvement_threshold {
            push_capped(
                &mut self.improvement_areas,
                ImprovementArea {
                    area: "success_rate".to_string(),
                    value: self.success_rate,
                    timestamp: now,
                },
                settings.max_improvement_areas,
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Code
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct CodePattern {
    pub change_count: u64,
    pub change_types: FrequencyTable,
    pub error_prone: bool,
    pub last_changed: Option<DateTime<Utc>>,
}

impl CodePattern {
    pub fn record(&mut self, change: &CodeChange, now: DateTime<Utc>, settings: &DetectorSettings) {
        self.change_count += 1;
        self.last_changed = Some(now);
        self.change_types
            .increment(change.change_type.as_deref().unwrap_or("unknown"));
        if self.change_count > settings.error_prone_changes
            && self.change_types.get("bug_fix") > settings.error_prone_bug_fixes
        {
            self.error_prone = true;
        }
    }
}

// ---------------------------------------------------------------------------
// Workflows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowPattern {
    pub execution_count: u64,
    pub average_duration_ms: f64,
    pub success_rate: f64,
    pub bottlenecks: FrequencyTable,
}

impl Default for WorkflowPattern {
    fn default() -> Self {
        Self {
            execution_count: 0,
            average_duration_ms: 0.0,
            success_rate: 1.0,
            bottlenecks: FrequencyTable::default(),
        }
    }
}

impl WorkflowPattern {
    pub fn record(&mut self, run: &WorkflowExecution, settings: &DetectorSettings) {
        self.execution_count += 1;
        if let Some(duration) = run.duration_ms {
            self.average_duration_ms = ema(self.average_duration_ms, duration, settings.alpha);
        }
        if let Some(success) = run.success {
            let sample = if success { 1.0 } else { 0.0 };
            self.success_rate = ema(self.success_rate, sample, settings.alpha);
        }
        let limit = self.average_duration_ms * settings.bottleneck_ratio;
        for step in &run.steps {
            if step.duration_ms.is_some_and(|d| d > limit) {
                self.bottlenecks.increment(&step.name);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ErrorContext {
    pub message: Option<String>,
    pub stack: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ErrorPattern {
    pub occurrences: u64,
    pub contexts: VecDeque<ErrorContext>,
    pub solutions: FrequencyTable,
    pub last_occurred: Option<DateTime<Utc>>,
}

impl ErrorPattern {
    /// Returns true once the error type has become recurring.
    pub fn record(&mut self, err: &ErrorEvent, now: DateTime<Utc>, settings: &DetectorSettings) -> bool {
        self.occurrences += 1;
        self.last_occurred = Some(now);
        push_capped(
            &mut self.contexts,
            ErrorContext {
                message: err.message.clone(),
                stack: err.stack.clone(),
                timestamp: now,
            },
            settings.error_context_window,
        );
        if let Some(solution) = err.solution.as_deref() {
            self.solutions.increment(solution);
        }
        self.occurrences >= settings.recurring_errors
    }
}
