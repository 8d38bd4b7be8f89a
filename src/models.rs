//! Core data models for the credit agent orchestrator

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::history::HistoryMessage;

//
// ================= Enums =================
//

/// Conversation stage. Exactly one stage is active per conversation;
/// the router and the turn engine branch on it.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Initial,
    PostVerification,
    PostAnalysis,
    AwaitingOfferResponse,
    OfferFormalized,
    OfferDeclined,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CreditDecision {
    #[default]
    Pending,
    Approved,
    Conditional,
    Rejected,
}

impl CreditDecision {
    /// Approved and conditional clients both qualify for an offer.
    pub fn is_pre_approved(&self) -> bool {
        matches!(self, CreditDecision::Approved | CreditDecision::Conditional)
    }
}

/// The specialized agents a turn can be routed to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Orchestrator,
    Verifier,
    Financial,
    Scoring,
    Bureau,
    Offer,
    Conversational,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProductKind {
    #[default]
    BusinessLoan,
    RevolvingLine,
    CommercialMortgage,
    Factoring,
}

/// Recommendation attached to a bureau report or assessment.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BureauRecommendation {
    Favorable,
    FavorableWithRemarks,
    #[default]
    Observe,
    Analyze,
    Unfavorable,
    Reject,
}

impl BureauRecommendation {
    pub fn is_blocking(&self) -> bool {
        matches!(
            self,
            BureauRecommendation::Unfavorable | BureauRecommendation::Reject
        )
    }

    pub fn is_favorable(&self) -> bool {
        matches!(
            self,
            BureauRecommendation::Favorable | BureauRecommendation::FavorableWithRemarks
        )
    }
}

/// Client reply to a generated offer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OfferReply {
    Accepted,
    Declined,
    Unclear,
}

//
// ================= Credit Request =================
//

/// What the client asked for, captured incrementally from their messages.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CreditRequest {
    pub product: Option<ProductKind>,
    pub amount_cop: Option<i64>,
    pub purpose: Option<String>,
    /// True once both product and amount are known.
    pub complete: bool,
}

impl CreditRequest {
    pub fn is_empty(&self) -> bool {
        self.product.is_none() && self.amount_cop.is_none() && self.purpose.is_none()
    }

    /// Merge newly extracted fields into the request, never erasing
    /// previously captured ones.
    pub fn merge(&mut self, newer: &CreditRequest) {
        if newer.product.is_some() {
            self.product = newer.product;
        }
        if newer.amount_cop.is_some() {
            self.amount_cop = newer.amount_cop;
        }
        if newer.purpose.is_some() {
            self.purpose = newer.purpose.clone();
        }
        self.complete = self.product.is_some() && self.amount_cop.is_some();
    }
}

//
// ================= Assessments =================
//

/// Ratios returned by the financial-analysis agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FinancialRatios {
    pub debt_equity: Option<f64>,
    pub current_ratio: Option<f64>,
    pub ebitda_margin: Option<f64>,
    pub interest_coverage: Option<f64>,
    pub roa: Option<f64>,
    pub revenue_growth: Option<f64>,
}

impl FinancialRatios {
    pub fn is_empty(&self) -> bool {
        self.debt_equity.is_none()
            && self.current_ratio.is_none()
            && self.ebitda_margin.is_none()
            && self.interest_coverage.is_none()
            && self.roa.is_none()
            && self.revenue_growth.is_none()
    }
}

/// Internal scoring agent output.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringAssessment {
    pub score: u32,
    pub decision: CreditDecision,
    pub recommended_amount_cop: Option<i64>,
    pub risk_grade: Option<String>,
    pub key_factors: Vec<String>,
}

/// Bureau agent output, after the reply JSON has been parsed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BureauAssessment {
    pub bureau_score: Option<u32>,
    pub score_interpretation: String,
    pub overall_behavior: String,
    pub recommendation: BureauRecommendation,
    pub alerts: Vec<String>,
    pub strengths: Vec<String>,
    pub tax_id: Option<String>,
    pub analyzed_at: Option<DateTime<Utc>>,
}

/// Internal + bureau analysis blended into one verdict.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CombinedAssessment {
    pub combined_score: Option<u32>,
    pub internal_score: Option<u32>,
    pub bureau_score: Option<u32>,
    pub internal_weight_pct: u32,
    pub bureau_weight_pct: u32,
    pub final_decision: CreditDecision,
    pub bureau_recommendation: BureauRecommendation,
    pub decision_context: String,
    pub determining_factors: Vec<String>,
    pub critical_alerts: Vec<String>,
}

/// Sanity check of the requested amount against the credit profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CoherenceCheck {
    pub coherent: bool,
    pub ratio: f64,
    pub note: String,
    pub suggested_amount_cop: Option<i64>,
}

//
// ================= Offer =================
//

/// Deterministically computed offer terms; the offer agent only words them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OfferTerms {
    pub product: ProductKind,
    pub approved_amount_cop: i64,
    pub term_months: u32,
    pub reference_dtf_pct: f64,
    pub spread_pct: f64,
    pub annual_rate_pct: f64,
    pub monthly_installment_cop: i64,
    pub guarantees: String,
    pub disbursement_days: u32,
    pub benefits: Vec<String>,
}

//
// ================= Conversation Context =================
//

/// Everything the orchestrator knows about one conversation. Serialized
/// back to the caller after each turn; every field has a serde default so
/// partial JSON from older clients still deserializes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationContext {
    pub stage: Stage,

    // Company identity
    pub company_name: Option<String>,
    pub tax_id: Option<String>,
    pub sector: Option<String>,
    pub years_operating: Option<u32>,

    // Verification outcome
    pub verified: bool,
    pub existing_client: bool,
    pub premium_client: bool,
    pub relationship_years: Option<u32>,
    pub risk_grade: Option<String>,
    pub benefits: Vec<String>,

    // Captured credit request
    pub request: CreditRequest,

    // Analysis outcome
    pub analysis_completed: bool,
    pub decision: CreditDecision,
    pub score: Option<u32>,
    pub internal_score: Option<u32>,
    pub bureau_score: Option<u32>,
    pub recommended_amount_cop: Option<i64>,
    pub financial_ratios: Option<FinancialRatios>,
    pub scoring: Option<ScoringAssessment>,
    pub bureau: Option<BureauAssessment>,
    pub combined: Option<CombinedAssessment>,
    pub coherence: Option<CoherenceCheck>,

    // Offer state
    pub offer_generated: bool,
    pub offer: Option<OfferTerms>,
    pub offer_date: Option<DateTime<Utc>>,
    pub client_reply: Option<OfferReply>,
    pub process_initiated: bool,
}

impl ConversationContext {
    /// Analysis done, favorable decision, and no offer put in front of the
    /// client yet.
    pub fn pre_approved_without_offer(&self) -> bool {
        self.analysis_completed
            && self.decision.is_pre_approved()
            && !self.offer_generated
            && self.stage != Stage::AwaitingOfferResponse
    }

    pub fn awaiting_offer_reply(&self) -> bool {
        self.stage == Stage::AwaitingOfferResponse
    }

    /// Headline score shown to downstream consumers: combined when
    /// available, internal otherwise.
    pub fn headline_score(&self) -> u32 {
        self.score.or(self.internal_score).unwrap_or(0)
    }
}

//
// ================= Payloads =================
//

/// One invocation of the orchestrator, as received from the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InvocationPayload {
    Message(MessagePayload),
    Document(DocumentPayload),
}

impl InvocationPayload {
    pub fn context(&self) -> &ConversationContext {
        match self {
            InvocationPayload::Message(p) => &p.conversation_context,
            InvocationPayload::Document(p) => &p.conversation_context,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            InvocationPayload::Message(p) => p.user_id.as_deref(),
            InvocationPayload::Document(p) => p.user_id.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePayload {
    pub message: String,
    #[serde(default)]
    pub conversation_context: ConversationContext,
    #[serde(default)]
    pub conversation_history: Vec<HistoryMessage>,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentPayload {
    #[serde(default)]
    pub financial_data: FinancialDocument,
    #[serde(default)]
    pub extracted_text: String,
    #[serde(default)]
    pub tables: Vec<serde_json::Value>,
    /// Free-text instruction that accompanied the upload.
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub conversation_context: ConversationContext,
    #[serde(default)]
    pub conversation_history: Vec<HistoryMessage>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl DocumentPayload {
    /// Whether the extraction produced enough material for full financial
    /// analysis (statements in text plus at least one table).
    pub fn has_full_statements(&self) -> bool {
        !self.tables.is_empty() && self.extracted_text.len() >= 200
    }

    /// Whether there is anything numeric at all to score on.
    pub fn has_partial_figures(&self) -> bool {
        !self.tables.is_empty() || self.extracted_text.len() >= 50
    }
}

/// Structured data extracted from an uploaded document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FinancialDocument {
    pub company_info: CompanyInfo,
    pub extraction_summary: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyInfo {
    pub name: Option<String>,
    pub sector: Option<String>,
}

//
// ================= Turn Result =================
//

/// Verification summary included in responses to verification turns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationInfo {
    pub tax_id: String,
    pub existing_client: bool,
    pub company_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_grade: Option<String>,
    pub benefits_count: usize,
}

/// What one turn returns to the caller. Context and history must be echoed
/// back on the next invocation; nothing is stored server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<CreditDecision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    #[serde(default)]
    pub offer_generated: bool,
    #[serde(default)]
    pub awaiting_response: bool,
    #[serde(default)]
    pub process_initiated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_decision: Option<OfferReply>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_request: Option<CreditRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executive_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technical_details: Option<serde_json::Value>,
    pub conversation_context: ConversationContext,
    pub conversation_history: Vec<HistoryMessage>,
    pub conversation_mode: String,
    pub user_id: String,
}

impl TurnResponse {
    /// Baseline successful response; flows fill in their extras.
    pub fn base(
        message: String,
        context: ConversationContext,
        history: Vec<HistoryMessage>,
        user_id: String,
    ) -> Self {
        Self {
            success: true,
            message,
            decision: None,
            score: None,
            offer_generated: false,
            awaiting_response: false,
            process_initiated: false,
            client_decision: None,
            verification: None,
            extracted_request: None,
            executive_summary: None,
            technical_details: None,
            conversation_context: context,
            conversation_history: history,
            conversation_mode: "dynamic".to_string(),
            user_id,
        }
    }
}

//
// ================= Display =================
//

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Initial => "initial",
            Stage::PostVerification => "post_verification",
            Stage::PostAnalysis => "post_analysis",
            Stage::AwaitingOfferResponse => "awaiting_offer_response",
            Stage::OfferFormalized => "offer_formalized",
            Stage::OfferDeclined => "offer_declined",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for CreditDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CreditDecision::Pending => "pending",
            CreditDecision::Approved => "approved",
            CreditDecision::Conditional => "conditional",
            CreditDecision::Rejected => "rejected",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for ProductKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProductKind::BusinessLoan => "Crédito Empresarial",
            ProductKind::RevolvingLine => "Línea de Crédito Rotativa",
            ProductKind::CommercialMortgage => "Hipotecario Comercial",
            ProductKind::Factoring => "Factoring",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AgentKind::Orchestrator => "orchestrator",
            AgentKind::Verifier => "verifier",
            AgentKind::Financial => "financial",
            AgentKind::Scoring => "scoring",
            AgentKind::Bureau => "bureau",
            AgentKind::Offer => "offer",
            AgentKind::Conversational => "conversational",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_tagging() {
        let json = serde_json::json!({
            "type": "message",
            "message": "Hola, necesito un crédito",
        });
        let payload: InvocationPayload = serde_json::from_value(json).unwrap();
        match payload {
            InvocationPayload::Message(p) => {
                assert_eq!(p.message, "Hola, necesito un crédito");
                assert_eq!(p.conversation_context.stage, Stage::Initial);
                assert!(p.conversation_history.is_empty());
            }
            _ => panic!("expected message payload"),
        }
    }

    #[test]
    fn test_partial_context_deserializes() {
        let json = serde_json::json!({
            "stage": "awaiting_offer_response",
            "decision": "approved",
            "analysis_completed": true,
        });
        let context: ConversationContext = serde_json::from_value(json).unwrap();
        assert_eq!(context.stage, Stage::AwaitingOfferResponse);
        assert_eq!(context.decision, CreditDecision::Approved);
        assert!(context.analysis_completed);
        assert!(context.internal_score.is_none());
    }

    #[test]
    fn test_pre_approved_without_offer() {
        let mut context = ConversationContext::default();
        assert!(!context.pre_approved_without_offer());

        context.analysis_completed = true;
        context.decision = CreditDecision::Approved;
        assert!(context.pre_approved_without_offer());

        context.offer_generated = true;
        assert!(!context.pre_approved_without_offer());
    }

    #[test]
    fn test_credit_request_merge_keeps_existing() {
        let mut request = CreditRequest {
            product: Some(ProductKind::BusinessLoan),
            amount_cop: None,
            purpose: Some("capital de trabajo".to_string()),
            complete: false,
        };
        let newer = CreditRequest {
            product: None,
            amount_cop: Some(500_000_000),
            purpose: None,
            complete: false,
        };
        request.merge(&newer);

        assert_eq!(request.product, Some(ProductKind::BusinessLoan));
        assert_eq!(request.amount_cop, Some(500_000_000));
        assert_eq!(request.purpose.as_deref(), Some("capital de trabajo"));
        assert!(request.complete);
    }
}
