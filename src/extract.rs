//! Text extraction and agent-reply parsing
//!
//! Everything that turns free text into structured facts lives here: tax id
//! detection, credit-request capture from Spanish messages, offer-reply
//! classification, and the lenient JSON recovery used on LLM replies.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::models::{
    BureauAssessment, BureauRecommendation, CreditDecision, CreditRequest, FinancialRatios,
    OfferReply, ProductKind, ScoringAssessment,
};

//
// ================= Tax id (NIT) =================
//

lazy_static! {
    static ref NIT_HYPHENATED: Regex = Regex::new(r"\b(\d{9}-\d)\b").unwrap();
    static ref NIT_DOTTED: Regex = Regex::new(r"\b(\d{3}\.?\d{3}\.?\d{3}-\d)\b").unwrap();
    static ref NIT_BARE: Regex = Regex::new(r"\b(\d{9})\b").unwrap();
}

/// Find a Colombian NIT in a message. Handles `900123456-7`,
/// `900.123.456-7` and the bare nine-digit form.
pub fn extract_nit(message: &str) -> Option<String> {
    for pattern in [&*NIT_HYPHENATED, &*NIT_DOTTED, &*NIT_BARE] {
        if let Some(captures) = pattern.captures(message) {
            let raw = captures.get(1).map(|m| m.as_str())?;
            return Some(raw.replace(['.', ' '], ""));
        }
    }
    None
}

/// Validate NIT shape: 8 to 10 digits once separators are stripped.
pub fn validate_nit(nit: &str) -> Result<(), String> {
    let digits: String = nit.chars().filter(|c| !['-', '.', ' '].contains(c)).collect();

    if digits.is_empty() {
        return Err("NIT vacío".to_string());
    }
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err("El NIT debe contener solo números".to_string());
    }
    if digits.len() < 8 || digits.len() > 10 {
        return Err("El NIT debe tener entre 8 y 10 dígitos".to_string());
    }
    Ok(())
}

/// Canonical lookup form: digits only, check digit separated by a hyphen.
pub fn normalize_nit(nit: &str) -> String {
    let digits: String = nit.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() >= 9 {
        format!("{}-{}", &digits[..digits.len() - 1], &digits[digits.len() - 1..])
    } else {
        digits
    }
}

//
// ================= Credit request =================
//

/// Product keywords, most specific first. Substring match on the lowered
/// message, same order the advisors trained the bot with.
const PRODUCT_KEYWORDS: &[(&str, ProductKind)] = &[
    ("capital de trabajo", ProductKind::BusinessLoan),
    ("línea de crédito", ProductKind::RevolvingLine),
    ("linea de credito", ProductKind::RevolvingLine),
    ("rotativ", ProductKind::RevolvingLine),
    ("hipotecari", ProductKind::CommercialMortgage),
    ("hipoteca", ProductKind::CommercialMortgage),
    ("inmueble", ProductKind::CommercialMortgage),
    ("propiedad", ProductKind::CommercialMortgage),
    ("factoring", ProductKind::Factoring),
    ("cuentas por cobrar", ProductKind::Factoring),
    ("cartera", ProductKind::Factoring),
    ("crédito empresarial", ProductKind::BusinessLoan),
    ("credito empresarial", ProductKind::BusinessLoan),
    ("empresarial", ProductKind::BusinessLoan),
    ("comercial", ProductKind::BusinessLoan),
    ("expansión", ProductKind::BusinessLoan),
    ("expansion", ProductKind::BusinessLoan),
    ("crecimiento", ProductKind::BusinessLoan),
    ("inversión", ProductKind::BusinessLoan),
    ("inversion", ProductKind::BusinessLoan),
    ("financiamiento", ProductKind::BusinessLoan),
];

const PURPOSE_KEYWORDS: &[(&str, &str)] = &[
    ("capital de trabajo", "capital de trabajo"),
    ("flujo de caja", "capital de trabajo"),
    ("inventario", "capital de trabajo"),
    ("operativ", "capital de trabajo"),
    ("operación", "capital de trabajo"),
    ("expansión", "expansión"),
    ("expansion", "expansión"),
    ("crecimiento", "expansión"),
    ("ampliación", "expansión"),
    ("equipos", "compra de equipos"),
    ("maquinaria", "compra de equipos"),
    ("tecnología", "compra de equipos"),
    ("inmueble", "compra de inmueble"),
    ("local", "compra de inmueble"),
    ("oficina", "compra de inmueble"),
    ("inversión", "inversión"),
    ("inversion", "inversión"),
];

lazy_static! {
    static ref AMOUNT_THOUSAND_MILLIONS: Regex =
        Regex::new(r"(?i)(\d{1,4})\s*mil\s*millones?").unwrap();
    static ref AMOUNT_MILLIONS: Regex =
        Regex::new(r"(?i)\$?\s*(\d{1,3}(?:[.,]\d{3})*)\s*millones?").unwrap();
    static ref AMOUNT_SHORT_M: Regex = Regex::new(r"\$?\s*(\d{1,4})\s*[Mm]{1,2}\b").unwrap();
    static ref AMOUNT_RAW_PESOS: Regex = Regex::new(r"\$\s*(\d{1,3}(?:[.,]\d{3})+)").unwrap();
    static ref SPELLED_FIVE_HUNDRED: Regex = Regex::new(r"(?i)quinientos?\s*millones?").unwrap();
    static ref SPELLED_ONE_THOUSAND: Regex = Regex::new(r"(?i)\bmil\s*millones?").unwrap();
}

/// Smallest amount worth capturing (COP).
const MIN_AMOUNT_COP: i64 = 1_000_000;
/// Requests above this are implausible and get clamped.
const MAX_AMOUNT_COP: i64 = 50_000_000_000;
const CLAMPED_AMOUNT_COP: i64 = 5_000_000_000;

fn digits_of(group: &str) -> Option<i64> {
    group.replace(['.', ','], "").parse::<i64>().ok()
}

/// Pull a requested amount (in COP) out of a message. Understands
/// `500 millones`, `$1.000 millones`, `5 mil millones`, `300M` and raw
/// peso figures such as `$500.000.000`.
pub fn extract_amount_cop(message: &str) -> Option<i64> {
    let amount = if let Some(c) = AMOUNT_THOUSAND_MILLIONS.captures(message) {
        digits_of(c.get(1)?.as_str())? * 1_000_000_000
    } else if let Some(c) = AMOUNT_MILLIONS.captures(message) {
        digits_of(c.get(1)?.as_str())? * 1_000_000
    } else if let Some(c) = AMOUNT_RAW_PESOS.captures(message) {
        let n = digits_of(c.get(1)?.as_str())?;
        // A grouped figure below $100M was almost certainly meant in millions.
        if n >= 100_000_000 {
            n
        } else {
            n * 1_000_000
        }
    } else if let Some(c) = AMOUNT_SHORT_M.captures(message) {
        digits_of(c.get(1)?.as_str())? * 1_000_000
    } else if SPELLED_FIVE_HUNDRED.is_match(message) {
        500_000_000
    } else if SPELLED_ONE_THOUSAND.is_match(message) {
        1_000_000_000
    } else {
        return None;
    };

    if amount < MIN_AMOUNT_COP {
        warn!(amount, "Discarding implausibly small amount");
        return None;
    }
    if amount > MAX_AMOUNT_COP {
        warn!(amount, "Clamping implausibly large amount");
        return Some(CLAMPED_AMOUNT_COP);
    }
    Some(amount)
}

/// Capture product, amount and purpose from a client message.
pub fn extract_credit_request(message: &str) -> CreditRequest {
    let lowered = message.to_lowercase();

    let product = PRODUCT_KEYWORDS
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .map(|(_, kind)| *kind);

    let purpose = PURPOSE_KEYWORDS
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .map(|(_, normalized)| normalized.to_string());

    let amount_cop = extract_amount_cop(message);

    CreditRequest {
        complete: product.is_some() && amount_cop.is_some(),
        product,
        amount_cop,
        purpose,
    }
}

//
// ================= Company profile hints =================
//

/// Sector keywords → canonical (unaccented) sector key used by the offer
/// and coherence tables.
const SECTOR_KEYWORDS: &[(&str, &str)] = &[
    ("construcción", "construccion"),
    ("construc", "construccion"),
    ("inmobiliaria", "construccion"),
    ("obra", "construccion"),
    ("comercio", "comercio"),
    ("retail", "comercio"),
    ("tienda", "comercio"),
    ("almacén", "comercio"),
    ("consultoría", "servicios"),
    ("asesoría", "servicios"),
    ("servicios", "servicios"),
    ("manufactura", "manufactura"),
    ("producción", "manufactura"),
    ("fábrica", "manufactura"),
    ("industrial", "manufactura"),
    ("software", "tecnologia"),
    ("tecnología", "tecnologia"),
    ("desarrollo", "tecnologia"),
    ("salud", "salud"),
    ("clínica", "salud"),
    ("hospital", "salud"),
    ("transporte", "transporte"),
    ("logística", "transporte"),
    ("fletes", "transporte"),
    ("agricultura", "agricultura"),
    ("agrícola", "agricultura"),
    ("agro", "agricultura"),
    ("cultivo", "agricultura"),
];

lazy_static! {
    static ref COMPANY_AFTER_NOUN: Regex =
        Regex::new(r"(?i)(?:empresa|compañía)\s+([A-Za-zÁÉÍÓÚÑáéíóúñ][A-Za-zÁÉÍÓÚÑáéíóúñ\s&]*?)(?:\s*,|\s*\.|$)")
            .unwrap();
    static ref COMPANY_WITH_SUFFIX: Regex =
        Regex::new(r"(?i)([A-Za-zÁÉÍÓÚÑáéíóúñ][A-Za-zÁÉÍÓÚÑáéíóúñ\s&]*?)\s+(s\.a\.s\.?|sas|ltda\.?|s\.a\.?)(?:\s|,|\.|$)")
            .unwrap();
    static ref YEARS_OPERATING: Regex = Regex::new(r"(?i)(\d+)\s+años").unwrap();
}

/// Leading filler words that are not part of a company name.
const NAME_FILLERS: &[&str] = &["somos", "la", "nuestra", "de", "el", "mi"];

fn strip_leading_fillers(name: &str) -> String {
    let mut words: Vec<&str> = name.split_whitespace().collect();
    while let Some(first) = words.first() {
        if NAME_FILLERS.contains(&first.to_lowercase().as_str()) {
            words.remove(0);
        } else {
            break;
        }
    }
    words.join(" ")
}

/// Incidental facts worth keeping from a free-form message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileHints {
    pub company_name: Option<String>,
    pub sector: Option<String>,
    pub years_operating: Option<u32>,
}

pub fn extract_profile_hints(message: &str) -> ProfileHints {
    let lowered = message.to_lowercase();

    let company_name = COMPANY_AFTER_NOUN
        .captures(message)
        .or_else(|| COMPANY_WITH_SUFFIX.captures(message))
        .and_then(|c| c.get(1))
        .map(|m| strip_leading_fillers(m.as_str().trim()))
        .filter(|name| name.len() > 2);

    let sector = SECTOR_KEYWORDS
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .map(|(_, canonical)| canonical.to_string());

    let years_operating = YEARS_OPERATING
        .captures(&lowered)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok());

    ProfileHints {
        company_name,
        sector,
        years_operating,
    }
}

//
// ================= Offer reply =================
//

const AFFIRMATIVE_WORDS: &[&str] = &[
    "sí", "si", "yes", "dale", "perfecto", "excelente", "acepto", "ok", "okay", "claro",
    "bueno", "afirmativo", "continuar", "continuo",
];

const AFFIRMATIVE_PHRASES: &[&str] = &["de acuerdo", "me interesa"];

const NEGATIVE_WORDS: &[&str] = &["no", "nope", "negativo", "paso", "declino", "rechazo"];

const NEGATIVE_PHRASES: &[&str] = &["ahora no", "más tarde", "lo pensaré", "después lo veo"];

/// Classify a reply to a pending offer. Token-based for single words so
/// that e.g. "si" inside "simulación" does not count as a yes.
pub fn classify_offer_reply(message: &str) -> OfferReply {
    let lowered = message.to_lowercase();
    let tokens: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric() && c != 'í' && c != 'é' && c != 'á' && c != 'ó' && c != 'ú' && c != 'ñ')
        .filter(|t| !t.is_empty())
        .collect();

    let has_word = |words: &[&str]| tokens.iter().any(|t| words.contains(t));
    let has_phrase = |phrases: &[&str]| phrases.iter().any(|p| lowered.contains(p));

    // Negatives first: "no, gracias" must not be read as unclear because
    // of the trailing pleasantry.
    if has_word(NEGATIVE_WORDS) || has_phrase(NEGATIVE_PHRASES) {
        return OfferReply::Declined;
    }
    if has_word(AFFIRMATIVE_WORDS) || has_phrase(AFFIRMATIVE_PHRASES) {
        return OfferReply::Accepted;
    }
    OfferReply::Unclear
}

//
// ================= LLM reply recovery =================
//

/// Strip markdown code fences the model likes to wrap JSON in.
pub fn clean_markdown(text: &str) -> String {
    let t = text.trim();
    if t.starts_with("```json") {
        t.replace("```json", "").replace("```", "").trim().to_string()
    } else if t.starts_with("```") {
        t.replace("```", "").trim().to_string()
    } else {
        t.to_string()
    }
}

/// Parse JSON out of a possibly messy model reply: direct parse first,
/// then line-by-line, then a balanced-brace scan over the whole text.
pub fn parse_json_lenient(text: &str) -> Option<Value> {
    let cleaned = clean_markdown(text);
    if cleaned.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
        return Some(value);
    }

    for line in cleaned.lines() {
        let line = line.trim();
        if line.starts_with('{') && line.ends_with('}') {
            if let Ok(value) = serde_json::from_str::<Value>(line) {
                return Some(value);
            }
        }
    }

    // Balanced-brace scan for an embedded object.
    let bytes = cleaned.as_bytes();
    let mut start = None;
    let mut depth = 0usize;
    for (i, b) in bytes.iter().enumerate() {
        match b {
            b'{' => {
                if start.is_none() {
                    start = Some(i);
                }
                depth += 1;
            }
            b'}' => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        if let Some(s) = start {
                            if let Ok(value) =
                                serde_json::from_str::<Value>(&cleaned[s..=i])
                            {
                                return Some(value);
                            }
                            start = None;
                        }
                    }
                }
            }
            _ => {}
        }
    }

    let preview: String = cleaned.chars().take(120).collect();
    warn!(preview = %preview, "Could not recover JSON from agent reply");
    None
}

//
// ================= Decision / recommendation parsing =================
//

/// Normalize the model's free-text decision (Spanish or English spellings).
pub fn normalize_decision(raw: &str) -> CreditDecision {
    let upper = raw.to_uppercase();
    if upper.contains("APROBADO") || upper.contains("APPROVED") {
        CreditDecision::Approved
    } else if upper.contains("CONDICIONAL") || upper.contains("CONDITIONAL") {
        CreditDecision::Conditional
    } else if upper.contains("RECHAZADO") || upper.contains("REJECTED") {
        CreditDecision::Rejected
    } else {
        CreditDecision::Pending
    }
}

pub fn parse_bureau_recommendation(raw: &str) -> BureauRecommendation {
    let upper = raw.to_uppercase();
    if upper.contains("RECHAZAR") {
        BureauRecommendation::Reject
    } else if upper.contains("DESFAVORABLE") {
        BureauRecommendation::Unfavorable
    } else if upper.contains("FAVORABLE CON") {
        BureauRecommendation::FavorableWithRemarks
    } else if upper.contains("FAVORABLE") {
        BureauRecommendation::Favorable
    } else if upper.contains("ANALIZAR") {
        BureauRecommendation::Analyze
    } else {
        BureauRecommendation::Observe
    }
}

//
// ================= Typed agent replies =================
//

fn value_as_u32(value: &Value, key: &str) -> Option<u32> {
    value.get(key).and_then(Value::as_u64).map(|v| v as u32)
}

fn value_as_i64(value: &Value, key: &str) -> Option<i64> {
    value.get(key).and_then(Value::as_i64)
}

fn value_as_strings(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

/// Parse the scoring agent's JSON reply into a typed assessment.
pub fn parse_scoring_assessment(reply: &str) -> Option<ScoringAssessment> {
    let value = parse_json_lenient(reply)?;

    let score = value_as_u32(&value, "score")?;
    let decision = value
        .get("decision")
        .and_then(Value::as_str)
        .map(normalize_decision)
        .unwrap_or_default();

    Some(ScoringAssessment {
        score,
        decision,
        recommended_amount_cop: value_as_i64(&value, "recommended_amount_cop"),
        risk_grade: value
            .get("risk_grade")
            .and_then(Value::as_str)
            .map(|s| s.to_string()),
        key_factors: value_as_strings(&value, "key_factors"),
    })
}

/// Parse the bureau agent's JSON reply into a typed assessment.
pub fn parse_bureau_assessment(reply: &str, tax_id: &str) -> BureauAssessment {
    let Some(value) = parse_json_lenient(reply) else {
        // Unusable reply: fall back to a neutral assessment that forces
        // manual review rather than silently approving.
        return BureauAssessment {
            bureau_score: None,
            score_interpretation: "Análisis de buró no disponible".to_string(),
            overall_behavior: "No se pudo analizar".to_string(),
            recommendation: BureauRecommendation::Observe,
            alerts: vec!["Respuesta del agente de buró no interpretable".to_string()],
            strengths: Vec::new(),
            tax_id: Some(tax_id.to_string()),
            analyzed_at: Some(chrono::Utc::now()),
        };
    };

    BureauAssessment {
        bureau_score: value_as_u32(&value, "bureau_score"),
        score_interpretation: value
            .get("score_interpretation")
            .and_then(Value::as_str)
            .unwrap_or("Sin interpretación")
            .to_string(),
        overall_behavior: value
            .get("overall_behavior")
            .and_then(Value::as_str)
            .unwrap_or("Sin información")
            .to_string(),
        recommendation: value
            .get("recommendation")
            .and_then(Value::as_str)
            .map(parse_bureau_recommendation)
            .unwrap_or_default(),
        alerts: value_as_strings(&value, "alerts"),
        strengths: value_as_strings(&value, "strengths"),
        tax_id: Some(tax_id.to_string()),
        analyzed_at: Some(chrono::Utc::now()),
    }
}

/// Parse the financial agent's ratio JSON. Accepts either a flat object or
/// the ratios nested one level down (the agent labels them by fiscal year).
pub fn parse_financial_ratios(reply: &str) -> Option<FinancialRatios> {
    let value = parse_json_lenient(reply)?;

    let ratios_obj = if value.get("debt_equity").is_some() || value.get("current_ratio").is_some() {
        value.clone()
    } else {
        value
            .as_object()?
            .values()
            .find(|v| v.get("debt_equity").is_some() || v.get("current_ratio").is_some())?
            .clone()
    };

    let get = |key: &str| ratios_obj.get(key).and_then(Value::as_f64);

    let ratios = FinancialRatios {
        debt_equity: get("debt_equity"),
        current_ratio: get("current_ratio"),
        ebitda_margin: get("ebitda_margin"),
        interest_coverage: get("interest_coverage"),
        roa: get("roa"),
        revenue_growth: get("revenue_growth"),
    };

    if ratios.is_empty() {
        None
    } else {
        Some(ratios)
    }
}

//
// ================= Amount formatting =================
//

/// Colombian-style grouped pesos: `850000000` → `$850.000.000`.
pub fn format_cop(amount: i64) -> String {
    let negative = amount < 0;
    let digits = amount.abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 2);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    if negative {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}

/// Short form for conversation: `500000000` → `$500M`.
pub fn format_cop_millions(amount: i64) -> String {
    if amount >= 1_000_000_000 {
        let thousands = amount as f64 / 1_000_000_000.0;
        format!("${:.1} mil millones", thousands)
    } else {
        format!("${}M", amount / 1_000_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_nit_formats() {
        assert_eq!(
            extract_nit("Mi NIT es 900123456-7").as_deref(),
            Some("900123456-7")
        );
        assert_eq!(
            extract_nit("somos la empresa 800987654").as_deref(),
            Some("800987654")
        );
        assert_eq!(
            extract_nit("NIT 900.123.456-7 registrado").as_deref(),
            Some("900123456-7")
        );
        assert_eq!(extract_nit("hola, quiero información"), None);
    }

    #[test]
    fn test_validate_nit() {
        assert!(validate_nit("900123456-7").is_ok());
        assert!(validate_nit("900123456").is_ok());
        assert!(validate_nit("1234").is_err());
        assert!(validate_nit("").is_err());
    }

    #[test]
    fn test_normalize_nit_inserts_hyphen() {
        assert_eq!(normalize_nit("9001234567"), "900123456-7");
        assert_eq!(normalize_nit("900.123.456-7"), "900123456-7");
    }

    #[test]
    fn test_extract_amount_variants() {
        assert_eq!(extract_amount_cop("necesito 500 millones"), Some(500_000_000));
        assert_eq!(
            extract_amount_cop("un crédito de $1.000 millones"),
            Some(1_000_000_000)
        );
        assert_eq!(
            extract_amount_cop("serían 5 mil millones"),
            Some(5_000_000_000)
        );
        assert_eq!(extract_amount_cop("unos 300M"), Some(300_000_000));
        assert_eq!(
            extract_amount_cop("exactamente $500.000.000"),
            Some(500_000_000)
        );
        assert_eq!(
            extract_amount_cop("quinientos millones de pesos"),
            Some(500_000_000)
        );
        assert_eq!(extract_amount_cop("gracias por todo"), None);
    }

    #[test]
    fn test_amount_clamping() {
        // 60 mil millones is beyond any product ceiling.
        assert_eq!(
            extract_amount_cop("necesito 60 mil millones"),
            Some(5_000_000_000)
        );
    }

    #[test]
    fn test_extract_credit_request() {
        let request =
            extract_credit_request("Necesito un crédito de capital de trabajo por 500 millones");
        assert_eq!(request.product, Some(ProductKind::BusinessLoan));
        assert_eq!(request.amount_cop, Some(500_000_000));
        assert_eq!(request.purpose.as_deref(), Some("capital de trabajo"));
        assert!(request.complete);

        let partial = extract_credit_request("quisiera una línea de crédito rotativa");
        assert_eq!(partial.product, Some(ProductKind::RevolvingLine));
        assert!(!partial.complete);
    }

    #[test]
    fn test_profile_hints() {
        let hints = extract_profile_hints(
            "Somos Constructora Los Andes S.A.S, del sector construcción, con 12 años de experiencia",
        );
        assert_eq!(hints.company_name.as_deref(), Some("Constructora Los Andes"));
        assert_eq!(hints.sector.as_deref(), Some("construccion"));
        assert_eq!(hints.years_operating, Some(12));

        let hints = extract_profile_hints("La empresa Textiles del Valle, del sector manufactura");
        assert_eq!(hints.company_name.as_deref(), Some("Textiles del Valle"));
        assert_eq!(hints.sector.as_deref(), Some("manufactura"));
        assert_eq!(hints.years_operating, None);
    }

    #[test]
    fn test_classify_offer_reply() {
        assert_eq!(classify_offer_reply("Sí, me interesa"), OfferReply::Accepted);
        assert_eq!(classify_offer_reply("dale, perfecto"), OfferReply::Accepted);
        assert_eq!(classify_offer_reply("No, gracias"), OfferReply::Declined);
        assert_eq!(classify_offer_reply("ahora no, más tarde"), OfferReply::Declined);
        assert_eq!(
            classify_offer_reply("¿qué documentos necesito?"),
            OfferReply::Unclear
        );
        // "si" hiding inside another word is not an acceptance.
        assert_eq!(
            classify_offer_reply("quisiera una simulación"),
            OfferReply::Unclear
        );
    }

    #[test]
    fn test_parse_json_lenient() {
        let fenced = "```json\n{\"score\": 720}\n```";
        assert_eq!(parse_json_lenient(fenced).unwrap()["score"], 720);

        let mixed = "Claro, aquí está el resultado:\n{\"score\": 650, \"decision\": \"APROBADO\"}\nSaludos";
        assert_eq!(parse_json_lenient(mixed).unwrap()["decision"], "APROBADO");

        assert!(parse_json_lenient("sin json aquí").is_none());
    }

    #[test]
    fn test_normalize_decision() {
        assert_eq!(normalize_decision("APROBADO"), CreditDecision::Approved);
        assert_eq!(normalize_decision("approved"), CreditDecision::Approved);
        assert_eq!(normalize_decision("CONDICIONAL"), CreditDecision::Conditional);
        assert_eq!(normalize_decision("RECHAZADO"), CreditDecision::Rejected);
        assert_eq!(normalize_decision("???"), CreditDecision::Pending);
    }

    #[test]
    fn test_parse_scoring_assessment() {
        let reply = r#"```json
{"score": 710, "decision": "CONDICIONAL", "recommended_amount_cop": 800000000,
 "risk_grade": "B1", "key_factors": ["liquidez sólida"]}
```"#;
        let assessment = parse_scoring_assessment(reply).unwrap();
        assert_eq!(assessment.score, 710);
        assert_eq!(assessment.decision, CreditDecision::Conditional);
        assert_eq!(assessment.recommended_amount_cop, Some(800_000_000));
        assert_eq!(assessment.key_factors.len(), 1);
    }

    #[test]
    fn test_parse_bureau_assessment_fallback() {
        let assessment = parse_bureau_assessment("texto sin estructura", "900123456-7");
        assert_eq!(assessment.recommendation, BureauRecommendation::Observe);
        assert!(assessment.bureau_score.is_none());
        assert!(!assessment.alerts.is_empty());
    }

    #[test]
    fn test_parse_financial_ratios_nested() {
        let reply = r#"{"ratios_2024": {"debt_equity": 1.2, "current_ratio": 1.8,
            "ebitda_margin": 14.5, "interest_coverage": 3.2, "roa": 6.1,
            "revenue_growth": 9.0}}"#;
        let ratios = parse_financial_ratios(reply).unwrap();
        assert_eq!(ratios.debt_equity, Some(1.2));
        assert_eq!(ratios.revenue_growth, Some(9.0));

        assert!(parse_financial_ratios("{\"nota\": \"sin datos\"}").is_none());
    }

    #[test]
    fn test_format_cop() {
        assert_eq!(format_cop(850_000_000), "$850.000.000");
        assert_eq!(format_cop(1_500), "$1.500");
        assert_eq!(format_cop(0), "$0");
        assert_eq!(format_cop_millions(500_000_000), "$500M");
        assert_eq!(format_cop_millions(1_500_000_000), "$1.5 mil millones");
    }
}
