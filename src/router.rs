//! Turn router
//!
//! Picks exactly one downstream agent per turn. Pure function over the
//! conversation stage and a handful of detected signals, with a fixed
//! precedence order; no I/O and no LLM involvement.

use crate::extract::{extract_nit, validate_nit};
use crate::models::{AgentKind, ConversationContext, DocumentPayload};

/// Signals detected on the incoming payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signals {
    /// NIT found in the message, if any.
    pub nit: Option<String>,
    /// Whether the found NIT passes format validation.
    pub nit_valid: bool,
    /// The payload is a document upload.
    pub is_document: bool,
    /// Extraction yielded full statements (text plus tables).
    pub has_full_statements: bool,
    /// Extraction yielded at least some figures.
    pub has_partial_figures: bool,
}

impl Signals {
    pub fn for_message(message: &str) -> Self {
        let nit = extract_nit(message);
        let nit_valid = nit
            .as_deref()
            .map(|n| validate_nit(n).is_ok())
            .unwrap_or(false);

        Self {
            nit,
            nit_valid,
            ..Self::default()
        }
    }

    pub fn for_document(payload: &DocumentPayload) -> Self {
        Self {
            is_document: true,
            has_full_statements: payload.has_full_statements(),
            has_partial_figures: payload.has_partial_figures(),
            ..Self::default()
        }
    }
}

/// Routing precedence:
/// documents go straight to analysis; for messages, a pending offer reply
/// outranks offer generation, which outranks verification, which outranks
/// plain conversation.
pub fn route(context: &ConversationContext, signals: &Signals) -> AgentKind {
    if signals.is_document {
        return if signals.has_full_statements {
            AgentKind::Financial
        } else if signals.has_partial_figures {
            AgentKind::Scoring
        } else {
            // Nothing to analyze; the orchestrator agent explains what is
            // missing.
            AgentKind::Orchestrator
        };
    }

    if context.awaiting_offer_reply() {
        return AgentKind::Conversational;
    }

    if context.pre_approved_without_offer() {
        return AgentKind::Offer;
    }

    if signals.nit_valid {
        return AgentKind::Verifier;
    }

    AgentKind::Conversational
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreditDecision, Stage};

    fn context_at(stage: Stage) -> ConversationContext {
        ConversationContext {
            stage,
            ..ConversationContext::default()
        }
    }

    #[test]
    fn test_greeting_routes_to_conversational() {
        let signals = Signals::for_message("Hola, ¿qué productos tienen?");
        assert_eq!(
            route(&ConversationContext::default(), &signals),
            AgentKind::Conversational
        );
    }

    #[test]
    fn test_valid_nit_routes_to_verifier() {
        let signals = Signals::for_message("Mi NIT es 900123456-7");
        assert!(signals.nit_valid);
        assert_eq!(
            route(&ConversationContext::default(), &signals),
            AgentKind::Verifier
        );
    }

    #[test]
    fn test_awaiting_offer_reply_outranks_nit() {
        let context = context_at(Stage::AwaitingOfferResponse);
        let signals = Signals::for_message("Sí, mi NIT es 900123456-7");
        assert_eq!(route(&context, &signals), AgentKind::Conversational);
    }

    #[test]
    fn test_pre_approved_routes_to_offer() {
        let mut context = context_at(Stage::PostAnalysis);
        context.analysis_completed = true;
        context.decision = CreditDecision::Approved;

        let signals = Signals::for_message("¿Qué monto me pueden prestar?");
        assert_eq!(route(&context, &signals), AgentKind::Offer);
    }

    #[test]
    fn test_offer_already_generated_goes_conversational() {
        let mut context = context_at(Stage::AwaitingOfferResponse);
        context.analysis_completed = true;
        context.decision = CreditDecision::Approved;
        context.offer_generated = true;

        let signals = Signals::for_message("dale");
        assert_eq!(route(&context, &signals), AgentKind::Conversational);
    }

    #[test]
    fn test_document_routing() {
        use crate::models::DocumentPayload;

        let mut payload = DocumentPayload {
            financial_data: Default::default(),
            extracted_text: "Estado de resultados 2024 ".repeat(20),
            tables: vec![serde_json::json!({"rows": []})],
            prompt: String::new(),
            conversation_context: Default::default(),
            conversation_history: Vec::new(),
            user_id: None,
        };

        let signals = Signals::for_document(&payload);
        assert_eq!(
            route(&ConversationContext::default(), &signals),
            AgentKind::Financial
        );

        payload.tables.clear();
        payload.extracted_text =
            "Ingresos operacionales 2024: $500M, utilidad neta del ejercicio: $80M".to_string();
        let signals = Signals::for_document(&payload);
        assert_eq!(
            route(&ConversationContext::default(), &signals),
            AgentKind::Scoring
        );

        payload.extracted_text = String::new();
        let signals = Signals::for_document(&payload);
        assert_eq!(
            route(&ConversationContext::default(), &signals),
            AgentKind::Orchestrator
        );
    }

    #[test]
    fn test_invalid_nit_falls_back_to_conversational() {
        // 1234 matches no NIT pattern at all, so no signal is raised.
        let signals = Signals::for_message("mi nit es 1234");
        assert!(!signals.nit_valid);
        assert_eq!(
            route(&ConversationContext::default(), &signals),
            AgentKind::Conversational
        );
    }
}
