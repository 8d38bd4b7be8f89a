//! Turn engine
//!
//! One invocation in, one response out: route the payload to an agent
//! flow, build its prompt, call the model, parse the reply and merge the
//! updated context. State lives in the payload, never here.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::agents::AgentRegistry;
use crate::analysis::{check_coherence, combine_assessments, dual_analysis_summary};
use crate::bureau::CreditBureau;
use crate::directory::ClientDirectory;
use crate::extract::{
    classify_offer_reply, clean_markdown, extract_credit_request, extract_profile_hints,
    format_cop_millions, normalize_nit, parse_bureau_assessment, parse_financial_ratios,
    parse_scoring_assessment, validate_nit,
};
use crate::history::record_exchange;
use crate::llm::LlmClient;
use crate::models::{
    AgentKind, ConversationContext, CreditDecision, DocumentPayload, InvocationPayload,
    MessagePayload, OfferReply, Stage, TurnResponse, VerificationInfo,
};
use crate::offer::{
    acceptance_message, build_offer, clarification_message, decline_message, product_for,
};
use crate::prompts;
use crate::router::{route, Signals};
use crate::Result;

const DEFAULT_USER_ID: &str = "anonymous";

/// Reply sent when a NIT does not have a valid Colombian format.
fn invalid_nit_reply(reason: &str) -> String {
    format!(
        "Lo siento, el NIT que proporcionaste no tiene un formato válido. {}\n\n\
         Por favor indícalo en uno de estos formatos:\n\
         - 900123456-7 (con guión)\n\
         - 900123456 (solo números)\n\
         - 900.123.456-7 (con puntos y guión)\n\n\
         ¿Podrías indicarme nuevamente el NIT de tu empresa?",
        reason
    )
}

/// Coordinates the agents for one conversation turn.
pub struct Orchestrator {
    llm: Arc<dyn LlmClient>,
    registry: AgentRegistry,
    directory: Arc<dyn ClientDirectory>,
    bureau: Arc<dyn CreditBureau>,
}

impl Orchestrator {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        registry: AgentRegistry,
        directory: Arc<dyn ClientDirectory>,
        bureau: Arc<dyn CreditBureau>,
    ) -> Self {
        Self {
            llm,
            registry,
            directory,
            bureau,
        }
    }

    async fn call_agent(&self, kind: AgentKind, input: &str) -> Result<String> {
        debug!(agent = %kind, input_len = input.len(), "Calling agent");
        let reply = self
            .llm
            .complete(self.registry.system_prompt(kind), input)
            .await?;
        Ok(clean_markdown(&reply))
    }

    /// Handle one turn end to end.
    pub async fn handle_turn(&self, payload: InvocationPayload) -> Result<TurnResponse> {
        let user_id = payload
            .user_id()
            .unwrap_or(DEFAULT_USER_ID)
            .to_string();

        match payload {
            InvocationPayload::Message(message) => {
                let signals = Signals::for_message(&message.message);
                let agent = route(&message.conversation_context, &signals);

                info!(
                    agent = %agent,
                    stage = %message.conversation_context.stage,
                    "Routing message turn"
                );

                match agent {
                    AgentKind::Verifier => {
                        self.verification_flow(message, signals, user_id).await
                    }
                    AgentKind::Offer => self.offer_flow(message, user_id).await,
                    AgentKind::Conversational
                        if message.conversation_context.awaiting_offer_reply() =>
                    {
                        self.offer_reply_flow(message, user_id)
                    }
                    _ => self.conversational_flow(message, user_id).await,
                }
            }
            InvocationPayload::Document(document) => {
                let signals = Signals::for_document(&document);
                let agent = route(&document.conversation_context, &signals);

                info!(agent = %agent, "Routing document turn");

                match agent {
                    AgentKind::Financial => self.financial_flow(document, user_id).await,
                    AgentKind::Scoring => self.direct_scoring_flow(document, user_id).await,
                    _ => self.insufficient_data_flow(document, user_id).await,
                }
            }
        }
    }

    //
    // ================= Verification =================
    //

    async fn verification_flow(
        &self,
        payload: MessagePayload,
        signals: Signals,
        user_id: String,
    ) -> Result<TurnResponse> {
        let Some(nit) = signals.nit else {
            warn!("Verifier selected without a NIT, falling back to conversational");
            return self.conversational_flow(payload, user_id).await;
        };

        let mut context = payload.conversation_context;

        if let Err(reason) = validate_nit(&nit) {
            let reply = invalid_nit_reply(&reason);
            let history = record_exchange(payload.conversation_history, &payload.message, &reply);
            return Ok(TurnResponse::base(reply, context, history, user_id));
        }

        let extracted = extract_credit_request(&payload.message);
        context.request.merge(&extracted);

        let normalized = normalize_nit(&nit);
        let record = self.directory.lookup(&normalized);

        info!(
            tax_id = %normalized,
            existing_client = record.existing_client,
            "Client lookup completed"
        );

        let input = prompts::verifier_input(&record, &normalized, &context);
        let reply = self.call_agent(AgentKind::Verifier, &input).await?;

        // Early warning when an existing client asks far beyond their
        // profile; the real verdict still belongs to the analysis flow.
        if record.existing_client {
            if let (Some(score), Some(amount)) = (record.internal_score, context.request.amount_cop)
            {
                let coherence = check_coherence(
                    amount,
                    score,
                    record.sector.or(context.sector.as_deref()),
                    true,
                );
                if !coherence.coherent {
                    warn!(ratio = coherence.ratio, "Requested amount out of profile range");
                }
                context.coherence = Some(coherence);
            }
        }

        context.tax_id = Some(normalized.clone());
        context.verified = true;
        context.existing_client = record.existing_client;
        context.company_name = Some(record.name.clone());
        context.stage = Stage::PostVerification;
        context.internal_score = record.internal_score;
        context.risk_grade = record.risk_grade.map(str::to_string);
        context.benefits = record.benefits.iter().map(|b| b.to_string()).collect();

        if record.existing_client {
            context.premium_client = record.internal_score.unwrap_or(0) >= 750;
            context.relationship_years = Some(record.relationship_years);
            if context.sector.is_none() {
                context.sector = record.sector.map(str::to_string);
            }
        }

        let verification = VerificationInfo {
            tax_id: normalized,
            existing_client: record.existing_client,
            company_name: record.name.clone(),
            internal_score: record.internal_score,
            risk_grade: record.risk_grade.map(str::to_string),
            benefits_count: record.benefits.len(),
        };

        let history = record_exchange(payload.conversation_history, &payload.message, &reply);

        let mut response = TurnResponse::base(reply, context, history, user_id);
        response.verification = Some(verification);
        if !extracted.is_empty() {
            response.extracted_request = Some(extracted);
        }
        Ok(response)
    }

    //
    // ================= Offer =================
    //

    async fn offer_flow(&self, payload: MessagePayload, user_id: String) -> Result<TurnResponse> {
        let context = &payload.conversation_context;

        if !(context.analysis_completed && context.decision.is_pre_approved()) {
            warn!("Offer requested without pre-approval, falling back to conversational");
            return self.conversational_flow(payload, user_id).await;
        }
        if context.awaiting_offer_reply() {
            return self.offer_reply_flow(payload, user_id);
        }

        let mut context = payload.conversation_context;
        let extracted = extract_credit_request(&payload.message);
        context.request.merge(&extracted);

        let product = product_for(context.request.product, context.sector.as_deref());
        let score = context.headline_score();
        let terms = build_offer(
            score,
            product,
            context.request.amount_cop,
            context.recommended_amount_cop,
            context.existing_client,
            context.sector.as_deref(),
        );

        info!(
            product = %product,
            amount = terms.approved_amount_cop,
            "Generating credit offer"
        );

        let company = context
            .company_name
            .clone()
            .unwrap_or_else(|| "tu empresa".to_string());
        let input = prompts::offer_input(&context, &terms, &company);
        let reply = self.call_agent(AgentKind::Offer, &input).await?;

        context.stage = Stage::AwaitingOfferResponse;
        context.offer_generated = true;
        context.offer = Some(terms);
        context.offer_date = Some(chrono::Utc::now());

        let decision = context.decision;
        let history = record_exchange(payload.conversation_history, &payload.message, &reply);

        let mut response = TurnResponse::base(reply, context, history, user_id);
        response.decision = Some(decision);
        response.score = Some(score);
        response.offer_generated = true;
        response.awaiting_response = true;
        Ok(response)
    }

    /// Reply to a pending offer. Deterministic; no model call.
    fn offer_reply_flow(&self, payload: MessagePayload, user_id: String) -> Result<TurnResponse> {
        let mut context = payload.conversation_context;
        let reply_kind = classify_offer_reply(&payload.message);

        info!(reply = ?reply_kind, "Processing offer reply");

        let (message, stage, initiated) = match reply_kind {
            OfferReply::Accepted => (acceptance_message(), Stage::OfferFormalized, true),
            OfferReply::Declined => (decline_message(), Stage::OfferDeclined, false),
            OfferReply::Unclear => {
                (clarification_message(), Stage::AwaitingOfferResponse, false)
            }
        };

        // The typed context keeps all analysis state; only the offer
        // fields move.
        context.stage = stage;
        context.client_reply = Some(reply_kind);
        context.process_initiated = initiated;

        let decision = context.decision;
        let score = context.headline_score();
        let history = record_exchange(payload.conversation_history, &payload.message, &message);

        let mut response = TurnResponse::base(message, context, history, user_id);
        response.client_decision = Some(reply_kind);
        response.process_initiated = initiated;
        response.decision = Some(decision);
        response.score = Some(score);
        response.awaiting_response = reply_kind == OfferReply::Unclear;
        Ok(response)
    }

    //
    // ================= Conversational =================
    //

    async fn conversational_flow(
        &self,
        payload: MessagePayload,
        user_id: String,
    ) -> Result<TurnResponse> {
        let mut context = payload.conversation_context;

        let extracted = extract_credit_request(&payload.message);
        context.request.merge(&extracted);

        let hints = extract_profile_hints(&payload.message);
        if context.company_name.is_none() {
            context.company_name = hints.company_name;
        }
        if context.sector.is_none() {
            context.sector = hints.sector;
        }
        if context.years_operating.is_none() {
            context.years_operating = hints.years_operating;
        }

        let input =
            prompts::conversational_input(&payload.message, &context, &payload.conversation_history);
        let reply = self.call_agent(AgentKind::Conversational, &input).await?;

        let history = record_exchange(payload.conversation_history, &payload.message, &reply);

        let mut response = TurnResponse::base(reply, context, history, user_id);
        if !extracted.is_empty() {
            response.extracted_request = Some(extracted);
        }
        Ok(response)
    }

    //
    // ================= Document analysis =================
    //

    /// Full pipeline: financial → scoring → bureau → combined verdict,
    /// then an offer (pre-approved) or a narrative summary (rejected).
    async fn financial_flow(
        &self,
        payload: DocumentPayload,
        user_id: String,
    ) -> Result<TurnResponse> {
        let mut context = payload.conversation_context.clone();

        info!("Financial analysis step 1: ratios");
        let fin_input =
            prompts::financial_input(&payload.financial_data, &payload.extracted_text, &payload.tables);
        let fin_reply = self.call_agent(AgentKind::Financial, &fin_input).await?;

        let Some(ratios) = parse_financial_ratios(&fin_reply) else {
            warn!("Financial agent returned no usable ratios");
            return self.insufficient_data_flow(payload, user_id).await;
        };

        info!("Financial analysis step 2: internal scoring");
        let scr_input = prompts::scoring_input(&ratios, &payload.financial_data, &context);
        let scr_reply = self.call_agent(AgentKind::Scoring, &scr_input).await?;
        let assessment = parse_scoring_assessment(&scr_reply).unwrap_or_default();
        let internal_score = assessment.score;

        if let Some(amount) = context.request.amount_cop {
            if internal_score > 0 {
                let coherence = check_coherence(
                    amount,
                    internal_score,
                    context.sector.as_deref(),
                    context.existing_client,
                );
                if let Some(recommended) = assessment.recommended_amount_cop {
                    if amount > recommended + recommended / 2 {
                        warn!(
                            requested = amount,
                            recommended, "Requested amount well above scoring recommendation"
                        );
                    }
                }
                context.coherence = Some(coherence);
            }
        }

        let (bureau_assessment, combined) = if let Some(tax_id) = context.tax_id.clone() {
            info!("Financial analysis step 3: bureau consultation");
            let report = self.bureau.report(&tax_id);
            let input = prompts::bureau_input(&report, &context);
            let reply = self.call_agent(AgentKind::Bureau, &input).await?;
            let bureau = parse_bureau_assessment(&reply, &tax_id);

            let combined = combine_assessments(
                (internal_score > 0).then_some(internal_score),
                assessment.decision,
                &bureau,
            );
            (Some(bureau), Some(combined))
        } else {
            info!("No tax id on file, internal analysis only");
            (None, None)
        };

        let final_decision = combined
            .as_ref()
            .map(|c| c.final_decision)
            .unwrap_or(assessment.decision);
        let combined_score = combined
            .as_ref()
            .and_then(|c| c.combined_score)
            .unwrap_or(internal_score);

        info!(decision = %final_decision, score = combined_score, "Analysis verdict");

        let company = context
            .company_name
            .clone()
            .or_else(|| payload.financial_data.company_info.name.clone())
            .unwrap_or_else(|| "tu empresa".to_string());

        context.stage = Stage::PostAnalysis;
        context.analysis_completed = true;
        context.decision = final_decision;
        context.score = Some(combined_score);
        context.internal_score = Some(internal_score);
        context.bureau_score = bureau_assessment.as_ref().and_then(|b| b.bureau_score);
        context.recommended_amount_cop = assessment.recommended_amount_cop;
        context.company_name = Some(company.clone());
        context.financial_ratios = Some(ratios.clone());
        context.scoring = Some(assessment.clone());
        context.bureau = bureau_assessment.clone();
        context.combined = combined.clone();

        let technical_details = serde_json::json!({
            "financial_ratios": ratios,
            "scoring": assessment,
            "bureau": bureau_assessment,
            "combined": combined,
            "coherence": context.coherence,
            "requested_amount_cop": context.request.amount_cop,
            "recommended_amount_cop": assessment.recommended_amount_cop,
        });

        let user_message = if payload.prompt.is_empty() {
            "[Documento financiero recibido]".to_string()
        } else {
            payload.prompt.clone()
        };

        if final_decision.is_pre_approved() {
            info!("Pre-approved, generating offer");

            let product = product_for(context.request.product, context.sector.as_deref());
            let terms = build_offer(
                combined_score,
                product,
                context.request.amount_cop,
                assessment.recommended_amount_cop,
                context.existing_client,
                context.sector.as_deref(),
            );

            let input = prompts::offer_input(&context, &terms, &company);
            let reply = self.call_agent(AgentKind::Offer, &input).await?;

            context.stage = Stage::AwaitingOfferResponse;
            context.offer_generated = true;
            context.offer = Some(terms);
            context.offer_date = Some(chrono::Utc::now());

            let summary = format!(
                "Análisis completado: {} con score {}. Monto máximo: {}",
                final_decision,
                combined_score,
                assessment
                    .recommended_amount_cop
                    .map(format_cop_millions)
                    .unwrap_or_else(|| "N/A".to_string()),
            );

            let history =
                record_exchange(payload.conversation_history, &user_message, &reply);

            let mut response = TurnResponse::base(reply, context, history, user_id);
            response.decision = Some(final_decision);
            response.score = Some(combined_score);
            response.offer_generated = true;
            response.awaiting_response = true;
            response.executive_summary = Some(summary);
            response.technical_details = Some(technical_details);
            Ok(response)
        } else {
            info!("Not approved, generating narrative summary");

            let dual = dual_analysis_summary(
                internal_score,
                context.bureau_score,
                final_decision,
                context.existing_client,
            );
            let input = prompts::rejection_summary_input(&context, &company, &dual);
            let reply = self.call_agent(AgentKind::Orchestrator, &input).await?;

            let history =
                record_exchange(payload.conversation_history, &user_message, &reply);

            let mut response = TurnResponse::base(reply.clone(), context, history, user_id);
            response.decision = Some(final_decision);
            response.score = Some(combined_score);
            response.executive_summary = Some(reply);
            response.technical_details = Some(technical_details);
            Ok(response)
        }
    }

    /// Scoring straight from raw extraction, for documents without full
    /// statements. Always ends in a narrative summary, never an offer.
    async fn direct_scoring_flow(
        &self,
        payload: DocumentPayload,
        user_id: String,
    ) -> Result<TurnResponse> {
        let mut context = payload.conversation_context.clone();

        info!("Direct scoring step 1: assessment from raw extraction");
        let scr_input = prompts::direct_scoring_input(
            &payload.financial_data,
            &payload.extracted_text,
            &payload.tables,
        );
        let scr_reply = self.call_agent(AgentKind::Scoring, &scr_input).await?;
        let assessment = parse_scoring_assessment(&scr_reply).unwrap_or_default();
        let internal_score = assessment.score;

        let (bureau_assessment, combined) = if let Some(tax_id) = context.tax_id.clone() {
            info!("Direct scoring step 2: bureau consultation");
            let report = self.bureau.report(&tax_id);
            let input = prompts::bureau_input(&report, &context);
            let reply = self.call_agent(AgentKind::Bureau, &input).await?;
            let bureau = parse_bureau_assessment(&reply, &tax_id);

            let combined = combine_assessments(
                (internal_score > 0).then_some(internal_score),
                assessment.decision,
                &bureau,
            );
            (Some(bureau), Some(combined))
        } else {
            (None, None)
        };

        let final_decision = combined
            .as_ref()
            .map(|c| c.final_decision)
            .unwrap_or(assessment.decision);
        let combined_score = combined
            .as_ref()
            .and_then(|c| c.combined_score)
            .unwrap_or(internal_score);

        let company = context
            .company_name
            .clone()
            .or_else(|| payload.financial_data.company_info.name.clone())
            .unwrap_or_else(|| "tu empresa".to_string());

        context.stage = Stage::PostAnalysis;
        context.analysis_completed = true;
        context.decision = final_decision;
        context.score = Some(combined_score);
        context.internal_score = Some(internal_score);
        context.bureau_score = bureau_assessment.as_ref().and_then(|b| b.bureau_score);
        context.company_name = Some(company.clone());
        context.scoring = Some(assessment.clone());
        context.bureau = bureau_assessment.clone();
        context.combined = combined.clone();

        let dual = dual_analysis_summary(
            internal_score,
            context.bureau_score,
            final_decision,
            context.existing_client,
        );
        let input = prompts::rejection_summary_input(&context, &company, &dual);
        let reply = self.call_agent(AgentKind::Orchestrator, &input).await?;

        let technical_details = serde_json::json!({
            "scoring": assessment,
            "bureau": bureau_assessment,
            "combined": combined,
        });

        let user_message = if payload.prompt.is_empty() {
            "[Documento financiero recibido]".to_string()
        } else {
            payload.prompt.clone()
        };
        let history = record_exchange(payload.conversation_history, &user_message, &reply);

        let mut response = TurnResponse::base(reply.clone(), context, history, user_id);
        response.decision = Some(final_decision);
        response.score = Some(combined_score);
        response.executive_summary = Some(reply);
        response.technical_details = Some(technical_details);
        Ok(response)
    }

    /// Nothing usable was extracted; explain what is missing.
    async fn insufficient_data_flow(
        &self,
        payload: DocumentPayload,
        user_id: String,
    ) -> Result<TurnResponse> {
        let context = payload.conversation_context.clone();

        let input = prompts::insufficient_data_input(&payload.financial_data, &context);
        let reply = self.call_agent(AgentKind::Orchestrator, &input).await?;

        let user_message = if payload.prompt.is_empty() {
            "[Documento recibido]".to_string()
        } else {
            payload.prompt.clone()
        };
        let history = record_exchange(payload.conversation_history, &user_message, &reply);

        let mut response = TurnResponse::base(reply, context, history, user_id);
        response.decision = Some(CreditDecision::Pending);
        response.score = Some(0);
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::create_default_registry;
    use crate::bureau::SimulatedBureau;
    use crate::directory::InMemoryDirectory;
    use crate::llm::MockLlm;
    use crate::models::{CreditRequest, ProductKind};

    fn orchestrator_with(llm: MockLlm) -> Orchestrator {
        Orchestrator::new(
            Arc::new(llm),
            create_default_registry(),
            Arc::new(InMemoryDirectory::new()),
            Arc::new(SimulatedBureau::new()),
        )
    }

    fn message_payload(message: &str, context: ConversationContext) -> InvocationPayload {
        InvocationPayload::Message(MessagePayload {
            message: message.to_string(),
            conversation_context: context,
            conversation_history: Vec::new(),
            user_id: Some("test-user".to_string()),
        })
    }

    #[tokio::test]
    async fn test_verification_turn() {
        let llm = MockLlm::with_replies([
            "¡Hola Constructora Los Andes! Un gusto saludarte de nuevo.",
        ]);
        let orchestrator = orchestrator_with(llm);

        let payload = message_payload(
            "Hola, somos la empresa con NIT 900123456-7 y necesitamos un crédito empresarial por 500 millones",
            ConversationContext::default(),
        );

        let response = orchestrator.handle_turn(payload).await.unwrap();

        assert!(response.success);
        let verification = response.verification.unwrap();
        assert!(verification.existing_client);
        assert_eq!(verification.company_name, "Constructora Los Andes S.A.S");

        let context = &response.conversation_context;
        assert_eq!(context.stage, Stage::PostVerification);
        assert!(context.verified);
        assert_eq!(context.tax_id.as_deref(), Some("900123456-7"));
        assert_eq!(context.internal_score, Some(780));
        assert_eq!(context.request.amount_cop, Some(500_000_000));
        assert!(context.request.complete);
        assert_eq!(response.conversation_history.len(), 2);
    }

    #[tokio::test]
    async fn test_offer_accept_turn_is_deterministic() {
        // No scripted replies: accepting an offer must not hit the model.
        let orchestrator = orchestrator_with(MockLlm::new());

        let mut context = ConversationContext::default();
        context.stage = Stage::AwaitingOfferResponse;
        context.analysis_completed = true;
        context.decision = CreditDecision::Approved;
        context.score = Some(760);
        context.offer_generated = true;

        let response = orchestrator
            .handle_turn(message_payload("Sí, acepto la oferta", context))
            .await
            .unwrap();

        assert_eq!(response.client_decision, Some(OfferReply::Accepted));
        assert!(response.process_initiated);
        assert_eq!(response.conversation_context.stage, Stage::OfferFormalized);
        // Analysis state survives the reply turn.
        assert_eq!(response.conversation_context.score, Some(760));
        assert_eq!(response.decision, Some(CreditDecision::Approved));
    }

    #[tokio::test]
    async fn test_offer_decline_and_unclear() {
        let orchestrator = orchestrator_with(MockLlm::new());

        let mut context = ConversationContext::default();
        context.stage = Stage::AwaitingOfferResponse;
        context.analysis_completed = true;
        context.decision = CreditDecision::Approved;
        context.offer_generated = true;

        let declined = orchestrator
            .handle_turn(message_payload("no, gracias", context.clone()))
            .await
            .unwrap();
        assert_eq!(declined.conversation_context.stage, Stage::OfferDeclined);
        assert!(!declined.process_initiated);

        let unclear = orchestrator
            .handle_turn(message_payload("¿me repites la tasa?", context))
            .await
            .unwrap();
        assert_eq!(
            unclear.conversation_context.stage,
            Stage::AwaitingOfferResponse
        );
        assert!(unclear.awaiting_response);
        assert_eq!(unclear.client_decision, Some(OfferReply::Unclear));
    }

    #[tokio::test]
    async fn test_pre_approved_message_generates_offer() {
        let llm = MockLlm::with_replies(["Esta es tu oferta personalizada. ¿Deseas continuar? SÍ o NO"]);
        let orchestrator = orchestrator_with(llm);

        let mut context = ConversationContext::default();
        context.analysis_completed = true;
        context.decision = CreditDecision::Approved;
        context.score = Some(760);
        context.existing_client = true;
        context.company_name = Some("Constructora Los Andes S.A.S".to_string());
        context.sector = Some("construccion".to_string());
        context.request = CreditRequest {
            product: Some(ProductKind::BusinessLoan),
            amount_cop: Some(500_000_000),
            purpose: Some("expansión".to_string()),
            complete: true,
        };

        let response = orchestrator
            .handle_turn(message_payload("¿Qué condiciones me ofrecen?", context))
            .await
            .unwrap();

        assert!(response.offer_generated);
        assert!(response.awaiting_response);
        let context = &response.conversation_context;
        assert_eq!(context.stage, Stage::AwaitingOfferResponse);
        let offer = context.offer.as_ref().unwrap();
        assert_eq!(offer.approved_amount_cop, 500_000_000);
        assert!(context.offer_date.is_some());
    }

    #[tokio::test]
    async fn test_offer_without_pre_approval_falls_back() {
        let llm = MockLlm::with_replies(["Con gusto te cuento sobre nuestros productos."]);
        let orchestrator = orchestrator_with(llm);

        // Stage claims post-analysis but the decision is pending: the
        // router never picks Offer here, and the conversational agent
        // answers instead.
        let mut context = ConversationContext::default();
        context.stage = Stage::PostAnalysis;

        let response = orchestrator
            .handle_turn(message_payload("quiero una oferta", context))
            .await
            .unwrap();

        assert!(!response.offer_generated);
        assert!(response.message.contains("productos"));
    }

    #[tokio::test]
    async fn test_conversational_captures_request() {
        let llm = MockLlm::with_replies(["Perfecto, para continuar necesito el NIT de tu empresa."]);
        let orchestrator = orchestrator_with(llm);

        let response = orchestrator
            .handle_turn(message_payload(
                "Necesito un crédito de capital de trabajo por 300 millones para inventario",
                ConversationContext::default(),
            ))
            .await
            .unwrap();

        let request = &response.conversation_context.request;
        assert_eq!(request.product, Some(ProductKind::BusinessLoan));
        assert_eq!(request.amount_cop, Some(300_000_000));
        assert!(request.complete);
        assert!(response.extracted_request.is_some());
    }

    fn document_payload(context: ConversationContext) -> InvocationPayload {
        InvocationPayload::Document(DocumentPayload {
            financial_data: crate::models::FinancialDocument {
                company_info: crate::models::CompanyInfo {
                    name: Some("Constructora Los Andes S.A.S".to_string()),
                    sector: Some("construccion".to_string()),
                },
                extraction_summary: serde_json::json!({"pages": 12}),
            },
            extracted_text: "Estado de situación financiera 2024. ".repeat(10),
            tables: vec![serde_json::json!({"activos": 1000})],
            prompt: "Evalúen estos estados financieros".to_string(),
            conversation_context: context,
            conversation_history: Vec::new(),
            user_id: Some("test-user".to_string()),
        })
    }

    #[tokio::test]
    async fn test_financial_flow_approved_generates_offer() {
        let llm = MockLlm::with_replies([
            // financial agent
            r#"{"debt_equity": 0.8, "current_ratio": 1.9, "ebitda_margin": 18.0,
                "interest_coverage": 4.5, "roa": 7.2, "revenue_growth": 11.0}"#,
            // scoring agent
            r#"{"score": 760, "decision": "APROBADO", "recommended_amount_cop": 1500000000,
                "risk_grade": "A1", "key_factors": ["liquidez sólida"]}"#,
            // bureau agent
            r#"{"bureau_score": 745, "score_interpretation": "Excelente",
                "overall_behavior": "Normal", "recommendation": "FAVORABLE",
                "alerts": [], "strengths": ["sin moras"]}"#,
            // offer agent
            "Tu oferta está lista. ¿Continuamos? SÍ o NO",
        ]);
        let orchestrator = orchestrator_with(llm);

        let mut context = ConversationContext::default();
        context.tax_id = Some("900123456-7".to_string());
        context.existing_client = true;
        context.sector = Some("construccion".to_string());
        context.request = CreditRequest {
            product: Some(ProductKind::BusinessLoan),
            amount_cop: Some(500_000_000),
            purpose: None,
            complete: true,
        };

        let response = orchestrator
            .handle_turn(document_payload(context))
            .await
            .unwrap();

        assert_eq!(response.decision, Some(CreditDecision::Approved));
        // 760*65 + 745*35 = 754.75 → 754
        assert_eq!(response.score, Some(754));
        assert!(response.offer_generated);
        assert!(response.technical_details.is_some());

        let context = &response.conversation_context;
        assert!(context.analysis_completed);
        assert_eq!(context.stage, Stage::AwaitingOfferResponse);
        assert_eq!(context.internal_score, Some(760));
        assert_eq!(context.bureau_score, Some(745));
        assert!(context.financial_ratios.is_some());
        assert_eq!(context.offer.as_ref().unwrap().approved_amount_cop, 500_000_000);
    }

    #[tokio::test]
    async fn test_financial_flow_rejected_generates_summary() {
        let llm = MockLlm::with_replies([
            r#"{"debt_equity": 3.5, "current_ratio": 0.7, "ebitda_margin": 2.0,
                "interest_coverage": 0.8, "roa": -1.0, "revenue_growth": -5.0}"#,
            r#"{"score": 380, "decision": "RECHAZADO", "recommended_amount_cop": 0,
                "risk_grade": "D", "key_factors": ["liquidez crítica"]}"#,
            r#"{"bureau_score": 450, "score_interpretation": "Deficiente",
                "overall_behavior": "Irregular", "recommendation": "DESFAVORABLE",
                "alerts": ["mora vigente"], "strengths": []}"#,
            "Lamentablemente no podemos aprobar tu solicitud en este momento.",
        ]);
        let orchestrator = orchestrator_with(llm);

        let mut context = ConversationContext::default();
        context.tax_id = Some("400345678-9".to_string());

        let response = orchestrator
            .handle_turn(document_payload(context))
            .await
            .unwrap();

        assert_eq!(response.decision, Some(CreditDecision::Rejected));
        assert!(!response.offer_generated);
        assert!(response.executive_summary.is_some());
        assert_eq!(response.conversation_context.stage, Stage::PostAnalysis);
    }

    #[tokio::test]
    async fn test_unusable_document_asks_for_data() {
        let llm = MockLlm::with_replies([
            "No pude leer datos financieros del documento. ¿Podrías enviar los estados completos?",
        ]);
        let orchestrator = orchestrator_with(llm);

        let payload = InvocationPayload::Document(DocumentPayload {
            financial_data: Default::default(),
            extracted_text: String::new(),
            tables: Vec::new(),
            prompt: String::new(),
            conversation_context: ConversationContext::default(),
            conversation_history: Vec::new(),
            user_id: None,
        });

        let response = orchestrator.handle_turn(payload).await.unwrap();
        assert_eq!(response.decision, Some(CreditDecision::Pending));
        assert_eq!(response.score, Some(0));
        assert_eq!(response.user_id, "anonymous");
    }
}
