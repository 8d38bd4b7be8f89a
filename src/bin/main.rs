use credit_agent_orchestrator::{
    agents::create_default_registry,
    bureau::SimulatedBureau,
    directory::InMemoryDirectory,
    llm::MockLlm,
    models::{
        CompanyInfo, ConversationContext, DocumentPayload, FinancialDocument, InvocationPayload,
        MessagePayload,
    },
    orchestrator::Orchestrator,
};
use std::sync::Arc;
use tracing::info;

/// Scripted replies for the offline demo, in call order: verifier, then the
/// document pipeline (financial → scoring → bureau → offer).
fn demo_script() -> MockLlm {
    MockLlm::with_replies([
        "¡Hola! Qué gusto saludar de nuevo a Constructora Los Andes. Veo que llevan 5 años con \
         nosotros y que necesitan un crédito empresarial por $500 millones para expansión. Para \
         continuar con la evaluación, por favor compárteme los estados financieros 2024.",
        r#"{"debt_equity": 0.8, "current_ratio": 1.9, "ebitda_margin": 18.0,
            "interest_coverage": 4.5, "roa": 7.2, "revenue_growth": 11.0}"#,
        r#"{"score": 760, "decision": "APROBADO", "recommended_amount_cop": 1500000000,
            "risk_grade": "A1", "key_factors": ["liquidez sólida", "crecimiento sostenido"]}"#,
        r#"{"bureau_score": 745, "score_interpretation": "Excelente - Muy bajo riesgo",
            "overall_behavior": "Normal", "recommendation": "FAVORABLE",
            "alerts": [], "strengths": ["sin moras en 24 meses"]}"#,
        "¡Excelentes noticias! Tu solicitud fue PRE-APROBADA. Estas son las condiciones: \
         $500.000.000 a 60 meses, tasa DTF+3.7% (12.2% E.A.), cuota estimada $11.1M, garantía \
         pagaré, desembolso en 3 días hábiles. ¿Deseas continuar con la oferta? Responde SÍ o NO.",
    ])
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("Credit Agent Orchestrator - offline demo");

    let orchestrator = Orchestrator::new(
        Arc::new(demo_script()),
        create_default_registry(),
        Arc::new(InMemoryDirectory::new()),
        Arc::new(SimulatedBureau::new()),
    );

    // Turn 1: the client identifies their company and what they need.
    let first = orchestrator
        .handle_turn(InvocationPayload::Message(MessagePayload {
            message: "Hola, somos la empresa con NIT 900123456-7 y necesitamos un crédito \
                      empresarial por 500 millones para expansión"
                .to_string(),
            conversation_context: ConversationContext::default(),
            conversation_history: Vec::new(),
            user_id: Some("demo-user".to_string()),
        }))
        .await?;

    println!("\n=== TURNO 1: VERIFICACIÓN ===");
    println!("Etapa: {}", first.conversation_context.stage);
    println!("{}\n", first.message);

    // Turn 2: financial statements arrive as a document payload.
    let second = orchestrator
        .handle_turn(InvocationPayload::Document(DocumentPayload {
            financial_data: FinancialDocument {
                company_info: CompanyInfo {
                    name: Some("Constructora Los Andes S.A.S".to_string()),
                    sector: Some("construccion".to_string()),
                },
                extraction_summary: serde_json::json!({
                    "pages": 14,
                    "statements": ["balance", "resultados", "flujo de caja"],
                }),
            },
            extracted_text: "Estado de situación financiera 2024. Ingresos operacionales, \
                             costos y gastos, utilidad neta del ejercicio. "
                .repeat(5),
            tables: vec![serde_json::json!({"activos": 12_000, "pasivos": 5_300})],
            prompt: "Adjunto los estados financieros 2024 para la evaluación".to_string(),
            conversation_context: first.conversation_context,
            conversation_history: first.conversation_history,
            user_id: Some("demo-user".to_string()),
        }))
        .await?;

    println!("=== TURNO 2: ANÁLISIS + OFERTA ===");
    println!(
        "Decisión: {:?} | Score: {:?} | Etapa: {}",
        second.decision, second.score, second.conversation_context.stage
    );
    println!("{}\n", second.message);

    // Turn 3: the client accepts; handled without a model call.
    let third = orchestrator
        .handle_turn(InvocationPayload::Message(MessagePayload {
            message: "Sí, acepto la oferta".to_string(),
            conversation_context: second.conversation_context,
            conversation_history: second.conversation_history,
            user_id: Some("demo-user".to_string()),
        }))
        .await?;

    println!("=== TURNO 3: RESPUESTA A LA OFERTA ===");
    println!(
        "Decisión del cliente: {:?} | Proceso iniciado: {} | Etapa: {}",
        third.client_decision, third.process_initiated, third.conversation_context.stage
    );
    println!("{}", third.message);

    Ok(())
}
