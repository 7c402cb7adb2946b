// Mock analyst generators.
//
// Every generator is synchronous and draws from the RNG it is handed, so the
// server can call them with a thread-local RNG and tests can pass a seeded one.

use crate::model::{
    AnalysisType, DateRange, EarningsScenario, InvestigationData, InvestigationFeatures,
    MarketScenario, Sentiment,
};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const SECTORS: [&str; 5] = ["Technology", "Healthcare", "Financial", "Consumer", "Industrial"];

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn pick<'a, R: Rng + ?Sized>(rng: &mut R, items: &[&'a str]) -> &'a str {
    items[rng.random_range(0..items.len())]
}

// ============================================================================
// Stock validation
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockValidation {
    pub symbol: String,
    pub valid: bool,
    pub current_price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub change_percent_display: String,
    pub volume: u64,
    pub market_cap: u64,
    pub company_name: String,
    pub sector: String,
    pub timestamp: DateTime<Utc>,
    pub data_source: String,
    pub note: String,
}

/// Fabricate a quote for `symbol`. The symbol is uppercased.
pub fn validate_stock<R: Rng + ?Sized>(rng: &mut R, symbol: &str) -> StockValidation {
    let symbol = symbol.to_uppercase();
    let change_percent = round_to(rng.random_range(-5.0..5.0), 2);

    StockValidation {
        current_price: round_to(rng.random_range(50.0..250.0), 2),
        change: change_percent,
        change_percent,
        change_percent_display: format!("{:.2}%", change_percent),
        volume: rng.random_range(1_000_000..11_000_000),
        market_cap: rng.random_range(100_000_000_000..1_100_000_000_000),
        company_name: format!("{} Corporation", symbol),
        sector: "Technology".to_string(),
        timestamp: Utc::now(),
        data_source: "demo_api".to_string(),
        note: "Demo data - stock validation successful".to_string(),
        valid: true,
        symbol,
    }
}

// ============================================================================
// Investigation start
// ============================================================================

/// Open a new investigation record with a fresh v4 id
pub fn start_investigation(symbol: &str, date_range: Option<DateRange>) -> InvestigationData {
    let symbol = symbol.to_uppercase();
    let investigation_id = uuid::Uuid::new_v4().to_string();
    debug!("Opening investigation {} for {}", investigation_id, symbol);

    InvestigationData {
        investigation_id,
        message: format!(
            "Investigation started for {} with LangChain enhancement",
            symbol
        ),
        symbol,
        status: "started".to_string(),
        timestamp: Utc::now(),
        date_range: date_range.unwrap_or_default(),
        features: InvestigationFeatures::default(),
        note: "Demo mode - investigation simulated with LangChain integration".to_string(),
    }
}

// ============================================================================
// News sentiment
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsAnalysis {
    pub success: bool,
    pub symbol: String,
    pub analysis_type: AnalysisType,
    pub raw_analysis: String,
    pub sentiment: Sentiment,
    pub headlines: Vec<String>,
    pub confidence_score: f64,
    pub data_sources: usize,
    pub processing_time_seconds: f64,
    pub timestamp: DateTime<Utc>,
}

pub fn news_headlines(symbol: &str, sentiment: Sentiment) -> Vec<String> {
    match sentiment {
        Sentiment::Positive => vec![
            format!("{symbol} announces strategic partnership with major tech company"),
            format!("{symbol} Q4 earnings beat analyst expectations"),
            format!("{symbol} CEO discusses expansion plans in recent interview"),
            format!("Market analysts raise price targets for {symbol}"),
            format!("{symbol} stock showing strong momentum amid sector rotation"),
        ],
        Sentiment::Negative => vec![
            format!("{symbol} faces regulatory scrutiny over business practices"),
            format!("{symbol} misses revenue estimates as demand softens"),
            format!("Analysts downgrade {symbol} citing margin pressure"),
            format!("{symbol} supply chain disruptions weigh on outlook"),
            format!("Institutional holders trim {symbol} positions"),
        ],
        Sentiment::Mixed => vec![
            format!("{symbol} reports in-line quarter with cautious guidance"),
            format!("Analysts split on {symbol} after product launch"),
            format!("{symbol} expands into new market while trimming costs"),
            format!("Mixed signals emerge from {symbol} management commentary"),
            format!("{symbol} trades sideways as investors await clarity"),
        ],
    }
}

fn news_narrative(symbol: &str, sentiment: Sentiment) -> String {
    match sentiment {
        Sentiment::Positive => format!(
            "Looking at the recent news coverage for {symbol}, a clear pattern of positive developments stands out. \
The strategic partnership announcement points to strong business development capabilities, and the earnings beat \
demonstrates solid operational execution.\n\n\
The CEO's comments on expansion plans signal confidence in the business model, and together with analyst upgrades \
and raised price targets they form a narrative that supports investor optimism.\n\n\
Taken together the headlines describe a company hitting its operational stride. Coordinated positive news flow of \
this kind usually reflects underlying business strength, and the momentum in {symbol} appears fundamentally supported."
        ),
        Sentiment::Negative => format!(
            "Recent coverage of {symbol} is dominated by negative developments. Regulatory scrutiny and a revenue miss \
have shifted the conversation from growth toward risk.\n\n\
Analyst downgrades citing margin pressure, combined with supply chain disruptions, suggest the headwinds are \
operational rather than cosmetic. Institutional holders trimming positions reinforce that read.\n\n\
The headlines collectively describe a company under pressure on several fronts at once, and the selling in {symbol} \
looks consistent with a reassessment of its near-term outlook."
        ),
        Sentiment::Mixed => format!(
            "News flow around {symbol} is balanced, with constructive and cautious stories arriving side by side. \
The in-line quarter removed downside risk but the guarded guidance limited enthusiasm.\n\n\
Analysts are divided on the latest product launch, and the simultaneous expansion and cost trimming suggest \
management is hedging between growth and discipline.\n\n\
Overall the coverage does not point in a single direction; price action in {symbol} is likely to follow the next \
concrete catalyst rather than the current narrative."
        ),
    }
}

/// News sentiment analysis: positive 40%, negative 30%, mixed 30%
pub fn news_analysis<R: Rng + ?Sized>(rng: &mut R, symbol: &str) -> NewsAnalysis {
    let roll: f64 = rng.random();
    let sentiment = if roll < 0.4 {
        Sentiment::Positive
    } else if roll < 0.7 {
        Sentiment::Negative
    } else {
        Sentiment::Mixed
    };
    let headlines = news_headlines(symbol, sentiment);

    NewsAnalysis {
        success: true,
        symbol: symbol.to_string(),
        analysis_type: AnalysisType::NewsSentiment,
        raw_analysis: news_narrative(symbol, sentiment),
        sentiment,
        data_sources: headlines.len(),
        headlines,
        confidence_score: round_to(rng.random_range(6.0..9.5), 1),
        processing_time_seconds: 3.2,
        timestamp: Utc::now(),
    }
}

// ============================================================================
// Earnings impact
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PartialEarningsData")]
pub struct EarningsData {
    pub last_quarter_eps: f64,
    pub expected_eps: f64,
    pub revenue_growth: f64,
    pub beat_estimate: bool,
    pub guidance_updated: bool,
}

/// Caller-supplied figures. Missing numbers take the canned beat figures; a
/// missing `beat_estimate` is derived from the EPS comparison.
#[derive(Debug, Deserialize)]
struct PartialEarningsData {
    last_quarter_eps: Option<f64>,
    expected_eps: Option<f64>,
    revenue_growth: Option<f64>,
    beat_estimate: Option<bool>,
    guidance_updated: Option<bool>,
}

impl From<PartialEarningsData> for EarningsData {
    fn from(partial: PartialEarningsData) -> Self {
        let canned = EarningsData::default();
        let eps = partial.last_quarter_eps.unwrap_or(canned.last_quarter_eps);
        let expected = partial.expected_eps.unwrap_or(canned.expected_eps);
        Self {
            last_quarter_eps: eps,
            expected_eps: expected,
            revenue_growth: partial.revenue_growth.unwrap_or(canned.revenue_growth),
            beat_estimate: partial
                .beat_estimate
                .unwrap_or(eps - expected >= EPS_TOLERANCE),
            guidance_updated: partial.guidance_updated.unwrap_or(false),
        }
    }
}

const EPS_TOLERANCE: f64 = 0.005;

impl Default for EarningsData {
    fn default() -> Self {
        Self::for_scenario(EarningsScenario::Beat)
    }
}

impl EarningsData {
    /// Canned figures for each scenario
    pub fn for_scenario(scenario: EarningsScenario) -> Self {
        match scenario {
            EarningsScenario::Beat => Self {
                last_quarter_eps: 2.45,
                expected_eps: 2.32,
                revenue_growth: 8.5,
                beat_estimate: true,
                guidance_updated: true,
            },
            EarningsScenario::Miss => Self {
                last_quarter_eps: 2.10,
                expected_eps: 2.32,
                revenue_growth: 3.1,
                beat_estimate: false,
                guidance_updated: false,
            },
            EarningsScenario::Meet => Self {
                last_quarter_eps: 2.32,
                expected_eps: 2.32,
                revenue_growth: 5.4,
                beat_estimate: false,
                guidance_updated: false,
            },
        }
    }

    pub fn scenario(&self) -> EarningsScenario {
        if self.beat_estimate {
            EarningsScenario::Beat
        } else if (self.last_quarter_eps - self.expected_eps).abs() < EPS_TOLERANCE {
            EarningsScenario::Meet
        } else {
            EarningsScenario::Miss
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EarningsAnalysis {
    pub success: bool,
    pub symbol: String,
    pub analysis_type: AnalysisType,
    pub raw_analysis: String,
    pub scenario_type: EarningsScenario,
    pub earnings_data: EarningsData,
    pub eps_actual: f64,
    pub eps_expected: f64,
    pub revenue_growth: f64,
    pub beat_estimate: bool,
    pub confidence_score: f64,
    pub processing_time_seconds: f64,
    pub timestamp: DateTime<Utc>,
}

fn earnings_narrative(symbol: &str, data: &EarningsData, scenario: EarningsScenario) -> String {
    let eps = data.last_quarter_eps;
    let expected = data.expected_eps;
    let growth = data.revenue_growth;
    match scenario {
        EarningsScenario::Beat => format!(
            "Looking at {symbol}'s earnings performance, the numbers tell a story of operational excellence. \
EPS of ${eps:.2} exceeded expectations of ${expected:.2}, a meaningful beat that validates management's execution.\n\n\
Revenue growth of {growth}% points to strong demand, market share gains and effective pricing rather than \
financial engineering.\n\n\
Raising guidance shows confidence that the performance can be sustained. A beat-and-raise quarter like this is a \
fundamental catalyst, and the market reaction appears justified by the quality of the results."
        ),
        EarningsScenario::Miss => format!(
            "{symbol}'s earnings results reveal concerning trends. EPS of ${eps:.2} fell short of the ${expected:.2} \
expectation, pointing to operational challenges or market headwinds.\n\n\
Revenue growth of {growth}%, while positive, may not be enough to hold competitive position and hints at pricing \
pressure or execution issues.\n\n\
The miss raises questions about the accuracy of forward guidance. Restoring investor confidence will likely require \
strategic adjustments and a return to a credible growth trajectory."
        ),
        EarningsScenario::Meet => format!(
            "{symbol} delivered earnings in line with expectations: EPS of ${eps:.2} against ${expected:.2} expected. \
The quarter confirms operational stability without offering an upside surprise.\n\n\
Revenue growth of {growth}% is steady but not spectacular, and guidance was maintained with a cautious tone.\n\n\
In-line results rarely move a stock on their own; the reaction in {symbol} is more likely to be driven by broader \
market and sector forces until a clearer catalyst appears."
        ),
    }
}

/// Earnings impact analysis. Supplied figures decide the scenario; otherwise
/// beat, miss and meet are equally likely.
pub fn earnings_analysis<R: Rng + ?Sized>(
    rng: &mut R,
    symbol: &str,
    supplied: Option<EarningsData>,
) -> EarningsAnalysis {
    let (scenario, data) = match supplied {
        Some(data) => (data.scenario(), data),
        None => {
            let scenario = match rng.random_range(0..3) {
                0 => EarningsScenario::Beat,
                1 => EarningsScenario::Miss,
                _ => EarningsScenario::Meet,
            };
            (scenario, EarningsData::for_scenario(scenario))
        }
    };

    EarningsAnalysis {
        success: true,
        symbol: symbol.to_string(),
        analysis_type: AnalysisType::EarningsImpact,
        raw_analysis: earnings_narrative(symbol, &data, scenario),
        scenario_type: scenario,
        eps_actual: data.last_quarter_eps,
        eps_expected: data.expected_eps,
        revenue_growth: data.revenue_growth,
        beat_estimate: data.beat_estimate,
        earnings_data: data,
        confidence_score: round_to(rng.random_range(6.5..9.5), 1),
        processing_time_seconds: 2.8,
        timestamp: Utc::now(),
    }
}

// ============================================================================
// Market context
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketAnalysis {
    pub success: bool,
    pub symbol: String,
    pub analysis_type: AnalysisType,
    pub raw_analysis: String,
    pub market_scenario: MarketScenario,
    pub sector: String,
    pub confidence_score: f64,
    pub data_sources: usize,
    pub processing_time_seconds: f64,
    pub timestamp: DateTime<Utc>,
}

fn market_templates(symbol: &str, sector: &str, scenario: MarketScenario) -> Vec<String> {
    let sector = sector.to_lowercase();
    match scenario {
        MarketScenario::Bullish => vec![
            format!(
                "The {sector} sector is enjoying a significant tailwind from favorable regulatory changes and rising \
institutional allocation. {symbol} is well positioned within this rotation, benefiting from both fundamental \
improvement and technical momentum.\n\n\
Institutional investors are adding exposure to quality names in the space, and the macro backdrop supports continued \
growth. Relative strength against the broader market suggests a sustained shift in preferences, and companies like \
{symbol} are prime beneficiaries."
            ),
            format!(
                "Market dynamics favor {symbol}'s sector as investors look for pricing power and defensive \
characteristics. Businesses that can hold margins through inflationary periods are being rewarded.\n\n\
Sector consolidation lets leaders gain share and scale. {symbol} appears positioned to benefit from these structural \
changes, and the sector's technical setup shows accumulation across multiple timeframes."
            ),
        ],
        MarketScenario::Bearish => vec![
            format!(
                "The {sector} sector faces headwinds from regulatory pressure and shifting consumer preferences. \
{symbol} is caught in the broader decline as capital rotates toward defensive areas.\n\n\
Higher rates compress valuations for growth-oriented names, and institutional selling is visible across the sector. \
That broad-based pressure weighs even on fundamentally sound companies like {symbol}."
            ),
            format!(
                "Sentiment has turned against {symbol}'s sector on worries about competition and margin compression. \
Multiples are contracting as investors question growth sustainability.\n\n\
Cost inflation and supply chain disruption are squeezing profitability sector-wide, and distribution patterns in the \
technical picture point to continued pressure in the near term."
            ),
        ],
        MarketScenario::Neutral => vec![format!(
            "The {sector} sector is sending mixed signals, with positive and negative factors roughly offsetting. \
{symbol} is executing steadily but faces the same macro challenges as its peers.\n\n\
Some subsectors are performing well while others struggle, so company fundamentals matter more than sector \
momentum. Institutional activity is balanced and the sector appears to be consolidating while it waits for the next \
catalyst."
        )],
    }
}

/// Market context analysis: bullish 40%, bearish 30%, neutral 30%, random sector
pub fn market_analysis<R: Rng + ?Sized>(rng: &mut R, symbol: &str) -> MarketAnalysis {
    let sector = pick(rng, &SECTORS);
    let roll: f64 = rng.random();
    let scenario = if roll < 0.4 {
        MarketScenario::Bullish
    } else if roll < 0.7 {
        MarketScenario::Bearish
    } else {
        MarketScenario::Neutral
    };
    let mut templates = market_templates(symbol, sector, scenario);
    let idx = rng.random_range(0..templates.len());

    MarketAnalysis {
        success: true,
        symbol: symbol.to_string(),
        analysis_type: AnalysisType::MarketContext,
        raw_analysis: templates.swap_remove(idx),
        market_scenario: scenario,
        sector: sector.to_string(),
        confidence_score: round_to(rng.random_range(6.0..9.0), 1),
        data_sources: 15,
        processing_time_seconds: 3.5,
        timestamp: Utc::now(),
    }
}

// ============================================================================
// Sub-investigation
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubInvestigationKind {
    CorporateActions,
    FinancialPerformance,
    SectorDynamics,
    AnomalyPatterns,
}

impl SubInvestigationKind {
    /// Keyword dispatch on the finding that triggered the follow-up
    pub fn from_trigger(trigger: &str) -> Self {
        let trigger = trigger.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| trigger.contains(w));

        if has(&["partnership", "acquisition", "merger"]) {
            SubInvestigationKind::CorporateActions
        } else if has(&["earnings", "revenue", "guidance"]) {
            SubInvestigationKind::FinancialPerformance
        } else if has(&["sector", "market", "industry"]) {
            SubInvestigationKind::SectorDynamics
        } else {
            SubInvestigationKind::AnomalyPatterns
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            SubInvestigationKind::CorporateActions => "Strategic Corporate Actions Analysis",
            SubInvestigationKind::FinancialPerformance => "Financial Performance Deep Dive",
            SubInvestigationKind::SectorDynamics => "Sector Dynamics Deep Analysis",
            SubInvestigationKind::AnomalyPatterns => "Anomaly Pattern Recognition",
        }
    }

    fn narrative(self, symbol: &str) -> String {
        match self {
            SubInvestigationKind::CorporateActions => format!(
                "Deep investigation into {symbol}'s strategic corporate actions reveals significant implications for \
long-term value creation.\n\n\
PARTNERSHIP ANALYSIS:\nThe partnership indicates management can forge relationships that create durable advantages: \
technology sharing, wider market access, shared-infrastructure cost synergies and multi-year revenue commitments.\n\n\
COMPETITIVE POSITIONING IMPACT:\nThe deal gives {symbol} capabilities that would take years to build internally, and its \
structure suggests {symbol} negotiated from strength.\n\n\
FINANCIAL IMPLICATIONS:\nConservative estimates put the incremental contribution at $50-100M of annual revenue within \
18 months.\n\n\
RISK ASSESSMENT:\nIntegration complexity and customer overlap are the main risks; both appear manageable based on \
disclosed terms."
            ),
            SubInvestigationKind::FinancialPerformance => format!(
                "Comprehensive financial analysis of {symbol}'s earnings performance reveals underlying business \
dynamics that warrant closer examination.\n\n\
EARNINGS QUALITY ASSESSMENT:\nThe beat is driven by operational improvement rather than one-time items; revenue grew \
12.3%.\n\n\
MARGIN ANALYSIS:\nGross margins expanded 180 basis points year over year despite inflationary pressure.\n\n\
CASH FLOW IMPLICATIONS:\nOperating cash flow grew faster than reported earnings, generating $1.20 of cash per dollar \
of earnings.\n\n\
GUIDANCE CREDIBILITY:\n{symbol} management has historically beaten raised guidance, indicating a conservative \
forecasting approach."
            ),
            SubInvestigationKind::SectorDynamics => format!(
                "Comprehensive sector analysis reveals complex dynamics affecting {symbol} and the broader industry.\n\n\
REGULATORY ENVIRONMENT:\nNew compliance requirements raise barriers to entry and favor established players like \
{symbol}.\n\n\
SUPPLY CHAIN EVOLUTION:\n{symbol}'s diversified supplier base positions it to benefit while competitors struggle \
with disruption.\n\n\
COMPETITIVE LANDSCAPE EVOLUTION:\nConsolidation is accelerating as smaller players face capital constraints, \
creating acquisition opportunities for {symbol}.\n\n\
VALUATION MULTIPLE ANALYSIS:\nSector multiples compressed 15-20% over the past year, leaving room for re-rating of \
quality names."
            ),
            SubInvestigationKind::AnomalyPatterns => format!(
                "Advanced pattern recognition analysis of {symbol} has identified several anomalous signals that \
require deeper investigation.\n\n\
VOLUME PATTERN ANOMALIES:\nInstitutional activity clusters appear 2-3 days before major announcements.\n\n\
SENTIMENT DIVERGENCE ANALYSIS:\nSocial and traditional media sentiment diverge 15% from their historical \
correlation.\n\n\
PEER PERFORMANCE ANALYSIS:\n{symbol} outperforms sector peers by 8-12% over rolling 3-month windows despite similar \
fundamentals.\n\n\
CAPITAL FLOW ANOMALIES:\nInstitutional ownership concentration rose 12% last quarter against the sector rotation \
trend."
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubInvestigation {
    pub success: bool,
    pub symbol: String,
    pub investigation_type: String,
    pub sub_analysis: String,
    pub trigger_reason: String,
    pub confidence_score: f64,
    pub investigation_depth: String,
    pub processing_time_seconds: f64,
    pub timestamp: DateTime<Utc>,
    pub recommendations: Vec<String>,
}

/// Follow-up deep dive spawned by a finding
pub fn sub_investigation<R: Rng + ?Sized>(
    rng: &mut R,
    symbol: &str,
    trigger: &str,
) -> SubInvestigation {
    let kind = SubInvestigationKind::from_trigger(trigger);

    SubInvestigation {
        success: true,
        symbol: symbol.to_string(),
        investigation_type: kind.title().to_string(),
        sub_analysis: kind.narrative(symbol),
        trigger_reason: trigger.to_string(),
        confidence_score: 8.2 + rng.random_range(0.0..1.5),
        investigation_depth: "comprehensive".to_string(),
        processing_time_seconds: 4.5,
        timestamp: Utc::now(),
        recommendations: vec![
            "Continue monitoring for follow-up developments".to_string(),
            "Cross-reference findings with upcoming earnings".to_string(),
            "Assess impact on long-term investment thesis".to_string(),
        ],
    }
}
