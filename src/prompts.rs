//! Prompt builders
//!
//! Turn structured context into the input text each agent receives. The
//! system prompts live in `agents`; everything here is per-turn content.

use crate::analysis::friendly_client_profile;
use crate::bureau::{interpret_score, BureauReport};
use crate::directory::ClientRecord;
use crate::extract::{format_cop, format_cop_millions};
use crate::history::{recent_window, HistoryMessage, Sender, PROMPT_HISTORY_WINDOW};
use crate::models::{ConversationContext, FinancialDocument, FinancialRatios, OfferTerms};

/// Per-message cap when quoting history back to an agent.
const HISTORY_SNIPPET_LEN: usize = 200;

//
// ================= Shared blocks =================
//

fn context_block(context: &ConversationContext) -> String {
    let mut block = String::from("CONTEXTO DE LA CONVERSACIÓN:\n");

    block.push_str(&format!(
        "- Empresa: {}\n",
        context.company_name.as_deref().unwrap_or("No especificada")
    ));
    block.push_str(&format!(
        "- Sector: {}\n",
        context.sector.as_deref().unwrap_or("No especificado")
    ));
    block.push_str(&format!("- Etapa actual: {}\n", context.stage));
    block.push_str(&format!(
        "- Análisis completado: {}\n",
        if context.analysis_completed { "Sí" } else { "No" }
    ));

    if !context.request.is_empty() {
        block.push_str("\nINFORMACIÓN DEL CRÉDITO SOLICITADO:\n");
        if let Some(product) = context.request.product {
            block.push_str(&format!("- Tipo: {}\n", product));
        }
        if let Some(amount) = context.request.amount_cop {
            block.push_str(&format!(
                "- Monto: {} ({})\n",
                format_cop(amount),
                format_cop_millions(amount)
            ));
        }
        if let Some(purpose) = &context.request.purpose {
            block.push_str(&format!("- Propósito: {}\n", purpose));
        }
        if context.request.complete {
            block.push_str("- Solicitud: COMPLETA (no preguntar tipo ni monto de nuevo)\n");
        }
    }

    if context.analysis_completed {
        block.push_str(&format!(
            "- Decisión crediticia: {}\n- Score obtenido: {}/1000\n",
            context.decision,
            context.headline_score()
        ));
    }

    if context.verified {
        block.push_str(&format!(
            "- Cliente verificado: {}\n- NIT: {}\n",
            if context.existing_client { "Sí" } else { "No" },
            context.tax_id.as_deref().unwrap_or("No disponible")
        ));
    }

    if context.awaiting_offer_reply() {
        block.push_str("- Oferta generada: Sí, esperando respuesta del cliente (SÍ/NO)\n");
    }

    block
}

fn history_block(history: &[HistoryMessage]) -> String {
    if history.is_empty() {
        return String::new();
    }

    let mut block = String::from("\nHISTORIAL RECIENTE:\n");
    for message in recent_window(history, PROMPT_HISTORY_WINDOW) {
        let who = match message.sender {
            Sender::User => "Usuario",
            Sender::Bot => "CreditBot",
        };
        let text: String = message.message.chars().take(HISTORY_SNIPPET_LEN).collect();
        block.push_str(&format!("{}: {}\n", who, text));
    }
    block
}

//
// ================= Verifier =================
//

pub fn verifier_input(record: &ClientRecord, nit: &str, context: &ConversationContext) -> String {
    if record.existing_client {
        existing_client_input(record, nit, context)
    } else {
        new_client_input(record, nit, context)
    }
}

fn existing_client_input(
    record: &ClientRecord,
    nit: &str,
    context: &ConversationContext,
) -> String {
    let products = if record.products.is_empty() {
        "Productos básicos".to_string()
    } else {
        record.products.join(", ")
    };

    let benefits = if record.benefits.is_empty() {
        "Beneficios estándar".to_string()
    } else {
        format!("\n- {}", record.benefits.join("\n- "))
    };

    let profile = friendly_client_profile(record.internal_score, record.risk_grade);

    let mut request_section = String::new();
    if !context.request.is_empty() {
        request_section.push_str("INFORMACIÓN DEL CRÉDITO YA SOLICITADO (NO PREGUNTAR DE NUEVO):\n");
        if let Some(product) = context.request.product {
            request_section.push_str(&format!("- Tipo solicitado: {}\n", product));
        }
        if let Some(amount) = context.request.amount_cop {
            request_section.push_str(&format!("- Monto solicitado: {}\n", format_cop(amount)));
        }
        if let Some(purpose) = &context.request.purpose {
            request_section.push_str(&format!("- Propósito: {}\n", purpose));
        }
        request_section.push_str(
            "El cliente YA proporcionó esta información: úsala y pide los estados financieros.\n",
        );
    }

    format!(
        "VERIFICACIÓN DE CLIENTE - RESULTADO: CLIENTE EXISTENTE ✅\n\n\
         DATOS DEL CLIENTE:\n\
         - Empresa: {name}\n\
         - NIT consultado: {nit}\n\
         - Cliente desde: {since} ({years} años)\n\
         - Sector: {sector}\n\
         - Ciudad: {city}\n\n\
         PERFIL COMERCIAL:\n\
         - Descripción del perfil: {profile}\n\
         - Relación comercial: {quality}\n\n\
         PRODUCTOS ACTUALES:\n{products}\n\n\
         BENEFICIOS DISPONIBLES PARA ESTE CLIENTE:\n{benefits}\n\n\
         GESTOR ASIGNADO:\n- {manager}\n- Teléfono: {phone}\n\n\
         {request_section}\n\
         {context_block}\n\
         INSTRUCCIONES:\n\
         - Salúdalo reconociendo sus {years} años de relación y sus productos actuales.\n\
         - USA el perfil amigable indicado; no cites scores ni códigos.\n\
         - Si falta información del crédito, pregúntala conversacionalmente.",
        name = record.name,
        nit = nit,
        since = record.member_since.unwrap_or("No disponible"),
        years = record.relationship_years,
        sector = record.sector.unwrap_or("No especificado"),
        city = record.city.unwrap_or("No especificada"),
        profile = profile,
        quality = record.relationship_quality.unwrap_or("No evaluada"),
        products = products,
        benefits = benefits,
        manager = record.account_manager.unwrap_or("Ejecutivo asignado"),
        phone = record.manager_phone.unwrap_or(""),
        request_section = request_section,
        context_block = context_block(context),
    )
}

fn new_client_input(record: &ClientRecord, nit: &str, context: &ConversationContext) -> String {
    format!(
        "VERIFICACIÓN DE CLIENTE - RESULTADO: CLIENTE NUEVO 🆕\n\n\
         DATOS DE LA CONSULTA:\n\
         - NIT consultado: {nit}\n\
         - Resultado: {name}\n\
         - Sector estimado: {sector}\n\
         - Ciudad estimada: {city}\n\n\
         OBSERVACIONES:\n{notes}\n\n\
         {context_block}\n\
         INSTRUCCIONES:\n\
         Esta empresa NO es cliente actual. Dale una bienvenida cálida y explica que evaluaremos\n\
         su solicitud con productos para empresas en todas las etapas de desarrollo.\n\n\
         PRODUCTOS DISPONIBLES PARA EMPRESAS NUEVAS:\n\
         - Crédito Empresarial: $50M-$5.000M, DTF+4.5% a DTF+8%, hasta 5 años\n\
         - Hipotecario Comercial: hasta 70% del valor del inmueble, hasta 15 años\n\
         - Línea de Crédito Rotativa: disponibilidad inmediata\n\
         - Factoring: conversión inmediata de cuentas por cobrar\n\n\
         Pregunta conversacionalmente qué tipo de financiamiento necesita.",
        nit = nit,
        name = record.name,
        sector = record.sector.unwrap_or("Por determinar"),
        city = record.city.unwrap_or("Por determinar"),
        notes = record.notes.unwrap_or("Empresa nueva en nuestra base de datos"),
        context_block = context_block(context),
    )
}

//
// ================= Bureau =================
//

pub fn bureau_input(report: &BureauReport, context: &ConversationContext) -> String {
    if !report.has_history() {
        return no_history_bureau_input(report, context);
    }

    let mut debts = format!(
        "- Total deudas sistema: {}\n- Número de entidades: {}\n",
        format_cop(report.system_debts.total_cop),
        report.system_debts.entity_count
    );
    for debt in &report.system_debts.per_entity {
        debts.push_str(&format!(
            "  • {}: {} ({}) - {}\n",
            debt.bank,
            format_cop(debt.amount_cop),
            debt.product,
            debt.behavior
        ));
    }

    let negatives = if report.negative_reports.is_empty() {
        "- Sin reportes negativos\n".to_string()
    } else {
        let mut section = format!("- Total reportes negativos: {}\n", report.negative_reports.len());
        for negative in &report.negative_reports {
            section.push_str(&format!(
                "  • {} - {}: {} por {}\n    Estado: {} ({})\n",
                negative.date,
                negative.entity,
                negative.kind,
                format_cop(negative.amount_cop),
                negative.status,
                negative.note
            ));
        }
        section
    };

    let legal = if report.executive_claims.is_empty() && report.active_liens.is_empty() {
        "- Sin procesos legales vigentes\n".to_string()
    } else {
        let mut section = String::new();
        for claim in &report.executive_claims {
            section.push_str(&format!(
                "- Demanda ejecutiva: {} - {}: {} ({}) - {}\n",
                claim.date,
                claim.entity,
                format_cop(claim.amount_cop),
                claim.status,
                claim.court
            ));
        }
        for lien in &report.active_liens {
            section.push_str(&format!(
                "- Embargo: {} - {} por {} sobre {}\n",
                lien.date,
                lien.kind,
                format_cop(lien.amount_cop),
                lien.asset
            ));
        }
        section
    };

    let alerts = if report.alerts.is_empty() {
        "- Sin alertas identificadas\n".to_string()
    } else {
        report
            .alerts
            .iter()
            .enumerate()
            .map(|(i, alert)| format!("  {}. {}\n", i + 1, alert))
            .collect()
    };

    format!(
        "CONSULTA A CENTRALES DE RIESGO COLOMBIANAS\n\n\
         INFORMACIÓN BÁSICA:\n\
         - NIT consultado: {nit}\n\
         - Entidad consultora: {entity}\n\
         - Fecha consulta: {date}\n\
         - Última actualización: {updated}\n\n\
         SCORE DE BURÓ:\n\
         - Score externo: {score}\n\
         - Interpretación: {interpretation}\n\
         - Categoría de riesgo: {category}\n\
         - Calificación: {rating}\n\n\
         COMPORTAMIENTO CREDITICIO:\n\
         - Últimos 12 meses: {b12}\n\
         - Últimos 24 meses: {b24}\n\
         - Historial de pagos: {payments}\n\
         - Experiencia crediticia: {experience}\n\n\
         ENDEUDAMIENTO SISTEMA FINANCIERO:\n{debts}\n\
         REPORTES NEGATIVOS:\n{negatives}\n\
         PROCESOS LEGALES:\n{legal}\n\
         INFORMACIÓN SECTORIAL:\n- {industry}\n\n\
         OBSERVACIONES DEL BURÓ:\n{notes}\n\n\
         RECOMENDACIÓN INICIAL DEL BURÓ:\n{recommendation}\n\n\
         ALERTAS IDENTIFICADAS:\n{alerts}\n\
         {context_block}\n\
         INSTRUCCIONES:\n\
         Analiza el reporte completo y genera tu evaluación en el formato JSON indicado.\n\
         Considera score, comportamiento, deudas, reportes negativos y procesos legales.",
        nit = report.tax_id,
        entity = report.consulted_entity,
        date = report.consulted_at,
        updated = report.last_updated,
        score = report
            .external_score
            .map(|s| s.to_string())
            .unwrap_or_else(|| "Sin información".to_string()),
        interpretation = interpret_score(report.external_score),
        category = report.risk_category,
        rating = report.rating,
        b12 = report.behavior_12m,
        b24 = report.behavior_24m,
        payments = report.payment_history,
        experience = report.credit_experience,
        debts = debts,
        negatives = negatives,
        legal = legal,
        industry = report.industry_score_note,
        notes = report.bureau_notes,
        recommendation = report.bureau_recommendation,
        alerts = alerts,
        context_block = context_block(context),
    )
}

fn no_history_bureau_input(report: &BureauReport, context: &ConversationContext) -> String {
    format!(
        "CONSULTA A CENTRALES DE RIESGO COLOMBIANAS\n\n\
         INFORMACIÓN BÁSICA:\n\
         - NIT consultado: {nit}\n\
         - Resultado: Sin información en centrales de riesgo\n\
         - Entidad consultora: {entity}\n\n\
         HALLAZGOS:\n\
         - Score externo: Sin información\n\
         - Experiencia crediticia: Sin historial reportado\n\
         - Deudas sistema financiero: Sin registros\n\
         - Reportes negativos: Ninguno\n\
         - Procesos legales: Ninguno\n\n\
         {context_block}\n\
         SITUACIÓN:\n\
         La empresa no tiene historial en las centrales de riesgo. Puede ser una empresa nueva,\n\
         manejar solo productos básicos o financiarse con capital propio.\n\n\
         INSTRUCCIONES:\n\
         Genera la evaluación JSON para una empresa SIN historial crediticio. La ausencia de\n\
         información no es negativa, pero limita la evaluación; recomienda análisis basado en\n\
         estados financieros y garantías.",
        nit = report.tax_id,
        entity = report.consulted_entity,
        context_block = context_block(context),
    )
}

//
// ================= Offer =================
//

pub fn offer_input(
    context: &ConversationContext,
    offer: &OfferTerms,
    company_name: &str,
) -> String {
    let benefits = if offer.benefits.is_empty() {
        "- Beneficios estándar\n".to_string()
    } else {
        offer
            .benefits
            .iter()
            .map(|b| format!("- {}\n", b))
            .collect()
    };

    format!(
        "GENERAR OFERTA CREDITICIA PERSONALIZADA\n\n\
         INFORMACIÓN DEL ANÁLISIS COMPLETADO:\n\
         - Empresa: {company}\n\
         - Decisión crediticia: {decision}\n\
         - Cliente existente: {existing}\n\
         - Sector: {sector}\n\n\
         PRODUCTO SOLICITADO:\n\
         - Tipo: {product}\n\
         - Monto solicitado: {requested}\n\n\
         PARÁMETROS DE LA OFERTA CALCULADA (presentar tal cual):\n\
         - Monto aprobado: {amount}\n\
         - Plazo máximo: {term} meses\n\
         - Spread sobre DTF: {spread}%\n\
         - Tasa efectiva anual: {rate}% E.A.\n\
         - Cuota mensual estimada: {installment}\n\
         - Garantías requeridas: {guarantees}\n\
         - Tiempo de desembolso: {days} días hábiles\n\
         - DTF de referencia: {dtf}% E.A.\n\n\
         BENEFICIOS APLICABLES:\n{benefits}\n\
         {context_block}\n\
         INSTRUCCIONES:\n\
         1. Presenta la tabla de oferta con los parámetros calculados, sin modificarlos.\n\
         2. Personaliza según el perfil del cliente y menciona los beneficios aplicables.\n\
         3. Haz referencia al análisis completado para generar confianza.\n\
         4. INCLUYE la pregunta de continuidad (SÍ/NO).\n\
         5. Tono profesional pero entusiasta.",
        company = company_name,
        decision = context.decision,
        existing = if context.existing_client { "Sí" } else { "No" },
        sector = context.sector.as_deref().unwrap_or("general"),
        product = offer.product,
        requested = context
            .request
            .amount_cop
            .map(format_cop)
            .unwrap_or_else(|| "Por determinar".to_string()),
        amount = format_cop(offer.approved_amount_cop),
        term = offer.term_months,
        spread = offer.spread_pct,
        rate = offer.annual_rate_pct,
        installment = format_cop(offer.monthly_installment_cop),
        guarantees = offer.guarantees,
        days = offer.disbursement_days,
        dtf = offer.reference_dtf_pct,
        benefits = benefits,
        context_block = context_block(context),
    )
}

//
// ================= Financial / scoring =================
//

pub fn financial_input(
    document: &FinancialDocument,
    extracted_text: &str,
    tables: &[serde_json::Value],
) -> String {
    format!(
        "Analiza los siguientes datos financieros extraídos del documento:\n\n\
         DATOS ESTRUCTURADOS:\n{data}\n\n\
         TEXTO EXTRAÍDO:\n{text}\n\n\
         TABLAS FINANCIERAS:\n{tables}\n\n\
         Calcula los ratios financieros según las instrucciones del sistema.",
        data = serde_json::to_string_pretty(&document.extraction_summary)
            .unwrap_or_else(|_| "{}".to_string()),
        text = extracted_text,
        tables = serde_json::to_string_pretty(tables).unwrap_or_else(|_| "[]".to_string()),
    )
}

pub fn scoring_input(
    ratios: &FinancialRatios,
    document: &FinancialDocument,
    context: &ConversationContext,
) -> String {
    let company = document
        .company_info
        .name
        .as_deref()
        .or(context.company_name.as_deref())
        .unwrap_or("Empresa");

    let mut extra = String::new();
    if context.existing_client || !context.request.is_empty() {
        extra.push_str("\nCONTEXTO ADICIONAL DEL CLIENTE:\n");
        extra.push_str(&format!(
            "- Cliente existente: {}\n",
            if context.existing_client { "Sí" } else { "No" }
        ));
        if let Some(score) = context.internal_score {
            extra.push_str(&format!("- Score interno previo: {}/1000\n", score));
        }
        if let Some(sector) = &context.sector {
            extra.push_str(&format!("- Sector: {}\n", sector));
        }
        if let Some(amount) = context.request.amount_cop {
            extra.push_str(&format!("- Monto solicitado: {}\n", format_cop(amount)));
        }
        if let Some(purpose) = &context.request.purpose {
            extra.push_str(&format!("- Propósito: {}\n", purpose));
        }
        extra.push_str(
            "- Si es cliente existente con buen historial, considéralo un factor positivo.\n\
             - Compara el monto solicitado con tu cálculo de capacidad de pago.\n",
        );
    }

    format!(
        "Evalúa crediticiamente a {company} con base en:\n\n\
         RATIOS FINANCIEROS CALCULADOS:\n{ratios}\n\n\
         INFORMACIÓN DE LA EMPRESA:\n{info}\n\
         {extra}\n\
         Calcula score, decisión y monto máximo REALISTA según tu metodología.",
        company = company,
        ratios = serde_json::to_string_pretty(ratios).unwrap_or_else(|_| "{}".to_string()),
        info = serde_json::to_string_pretty(&document.company_info)
            .unwrap_or_else(|_| "{}".to_string()),
        extra = extra,
    )
}

pub fn direct_scoring_input(
    document: &FinancialDocument,
    extracted_text: &str,
    tables: &[serde_json::Value],
) -> String {
    let text: String = extracted_text.chars().take(2000).collect();
    let tables_preview: Vec<&serde_json::Value> = tables.iter().take(5).collect();

    format!(
        "Evalúa directamente los siguientes datos financieros parciales:\n\n\
         DATOS EXTRAÍDOS:\n{data}\n\n\
         TEXTO DEL DOCUMENTO:\n{text}\n\n\
         TABLAS:\n{tables}\n\n\
         Calcula ratios aproximados y asigna puntaje crediticio.",
        data = serde_json::to_string_pretty(&document.extraction_summary)
            .unwrap_or_else(|_| "{}".to_string()),
        text = text,
        tables = serde_json::to_string_pretty(&tables_preview).unwrap_or_else(|_| "[]".to_string()),
    )
}

//
// ================= Conversational / summaries =================
//

pub fn conversational_input(
    message: &str,
    context: &ConversationContext,
    history: &[HistoryMessage],
) -> String {
    format!(
        "{context_block}{history_block}\n\
         MENSAJE ACTUAL DEL USUARIO:\n{message}\n\n\
         Responde de forma natural y conversacional como un asesor crediticio experto.",
        context_block = context_block(context),
        history_block = history_block(history),
        message = message,
    )
}

/// Final narrative for rejected analyses. The dual-analysis explanation is
/// pre-formatted and must be used verbatim, without raw scores.
pub fn rejection_summary_input(
    context: &ConversationContext,
    company_name: &str,
    dual_summary: &str,
) -> String {
    format!(
        "GENERAR RESPUESTA CONVERSACIONAL FINAL - SIN SCORES TÉCNICOS\n\n\
         EMPRESA: {company}\n\n\
         EXPLICACIÓN DUAL YA FORMATEADA (usar tal como está):\n{summary}\n\n\
         {context_block}\n\
         INSTRUCCIONES:\n\
         1. USA la explicación dual exactamente como está escrita.\n\
         2. NUNCA menciones números de score.\n\
         3. Ofrece alternativas y próximos pasos constructivos.\n\
         4. Mantén tono profesional pero cercano.",
        company = company_name,
        summary = dual_summary,
        context_block = context_block(context),
    )
}

pub fn insufficient_data_input(
    document: &FinancialDocument,
    context: &ConversationContext,
) -> String {
    format!(
        "GENERAR RESPUESTA PARA DATOS INSUFICIENTES:\n\n\
         Contexto: no se pudieron extraer datos financieros suficientes para la evaluación.\n\
         Datos disponibles:\n{data}\n\n\
         {context_block}\n\
         Explica de forma conversacional y empática que faltan datos, qué documentos se\n\
         necesitan (estados financieros recientes) y cómo proceder.",
        data = serde_json::to_string_pretty(&document.extraction_summary)
            .unwrap_or_else(|_| "{}".to_string()),
        context_block = context_block(context),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{ClientDirectory, InMemoryDirectory};
    use crate::bureau::{CreditBureau, SimulatedBureau};
    use crate::models::{CreditRequest, ProductKind};

    #[test]
    fn test_existing_client_input_hides_raw_score() {
        let directory = InMemoryDirectory::new();
        let record = directory.lookup("900123456-7");
        let mut context = ConversationContext::default();
        context.request = CreditRequest {
            product: Some(ProductKind::BusinessLoan),
            amount_cop: Some(500_000_000),
            purpose: Some("capital de trabajo".to_string()),
            complete: true,
        };

        let input = verifier_input(&record, "900123456-7", &context);
        assert!(input.contains("CLIENTE EXISTENTE"));
        assert!(input.contains("cliente preferencial"));
        assert!(input.contains("NO PREGUNTAR DE NUEVO"));
        // Raw internal score must not be quoted at the verifier.
        assert!(!input.contains("780"));
    }

    #[test]
    fn test_new_client_input_lists_products() {
        let directory = InMemoryDirectory::new();
        let record = directory.lookup("111222333-4");
        let input = verifier_input(&record, "111222333-4", &ConversationContext::default());
        assert!(input.contains("CLIENTE NUEVO"));
        assert!(input.contains("Crédito Empresarial"));
    }

    #[test]
    fn test_bureau_input_includes_debts() {
        let bureau = SimulatedBureau::new();
        let report = bureau.report("800987654-3");
        let input = bureau_input(&report, &ConversationContext::default());
        assert!(input.contains("Banco Popular"));
        assert!(input.contains("REPORTES NEGATIVOS"));
        assert!(input.contains("FAVORABLE CON OBSERVACIONES"));
    }

    #[test]
    fn test_bureau_input_no_history() {
        let bureau = SimulatedBureau::new();
        let report = bureau.report("999888777-6");
        let input = bureau_input(&report, &ConversationContext::default());
        assert!(input.contains("SIN historial"));
    }

    #[test]
    fn test_offer_input_carries_terms() {
        let offer = crate::offer::build_offer(
            780,
            ProductKind::BusinessLoan,
            Some(500_000_000),
            None,
            true,
            Some("construccion"),
        );
        let mut context = ConversationContext::default();
        context.existing_client = true;
        context.decision = crate::models::CreditDecision::Approved;

        let input = offer_input(&context, &offer, "Constructora Los Andes S.A.S");
        assert!(input.contains("$500.000.000"));
        assert!(input.contains("SÍ/NO"));
        assert!(input.contains("Pagaré"));
    }

    #[test]
    fn test_conversational_input_truncates_history() {
        let long = "x".repeat(500);
        let history = vec![
            HistoryMessage::user(long),
            HistoryMessage::bot("respuesta"),
        ];
        let input = conversational_input("hola", &ConversationContext::default(), &history);
        assert!(input.contains("HISTORIAL RECIENTE"));
        assert!(!input.contains(&"x".repeat(201)));
    }
}
