//! Deterministic offer arithmetic
//!
//! Terms are computed here; the offer agent only words them. The LLM is
//! never allowed to invent amounts or rates.

use crate::models::{OfferTerms, ProductKind};

/// Reference DTF rate (E.A.) the spreads are quoted over.
pub const REFERENCE_DTF_PCT: f64 = 8.5;

/// Spread over DTF by internal score band.
fn spread_for_score(score: u32) -> f64 {
    if score >= 750 {
        4.5
    } else if score >= 650 {
        6.0
    } else if score >= 550 {
        7.5
    } else if score >= 400 {
        9.0
    } else {
        12.0
    }
}

fn sector_adjustment(sector: Option<&str>) -> f64 {
    match sector {
        Some("construccion") => -0.3,
        Some("agricultura") => 0.5,
        Some("manufactura") => 0.0,
        Some("comercio") => 0.2,
        Some("servicios") => 0.1,
        Some("tecnologia") => 0.3,
        Some("transporte") => 0.4,
        Some("salud") => -0.2,
        _ => 0.0,
    }
}

/// Ceiling by score band, before the product multiplier.
fn base_ceiling_for_score(score: u32) -> i64 {
    if score >= 750 {
        3_000_000_000
    } else if score >= 650 {
        1_500_000_000
    } else if score >= 550 {
        800_000_000
    } else if score >= 400 {
        400_000_000
    } else {
        200_000_000
    }
}

fn product_multiplier(product: ProductKind) -> f64 {
    match product {
        ProductKind::BusinessLoan => 1.0,
        ProductKind::RevolvingLine => 0.6,
        ProductKind::CommercialMortgage => 1.5,
        ProductKind::Factoring => 0.4,
    }
}

/// Maximum amount on offer. A recommendation from the scoring agent takes
/// precedence over the static bands.
fn max_amount(score: u32, product: ProductKind, recommended_cop: Option<i64>) -> i64 {
    if let Some(recommended) = recommended_cop.filter(|r| *r > 0) {
        return recommended;
    }
    (base_ceiling_for_score(score) as f64 * product_multiplier(product)) as i64
}

fn base_term_months(product: ProductKind) -> f64 {
    match product {
        ProductKind::BusinessLoan => 60.0,
        ProductKind::RevolvingLine => 12.0,
        ProductKind::CommercialMortgage => 180.0,
        ProductKind::Factoring => 6.0,
    }
}

fn term_months(score: u32, product: ProductKind, sector: Option<&str>) -> u32 {
    let base = base_term_months(product);

    let score_factor = if score >= 750 {
        1.0
    } else if score >= 650 {
        0.9
    } else if score >= 550 {
        0.8
    } else {
        0.7
    };

    let sector_factor = match sector {
        Some("agricultura") => 1.2,
        Some("construccion") => 1.1,
        _ => 1.0,
    };

    // Sector stretch never exceeds the product's base term.
    (base * score_factor * sector_factor).min(base).round() as u32
}

/// Fixed monthly installment, French amortization.
pub fn french_installment(amount_cop: i64, annual_rate_pct: f64, term_months: u32) -> i64 {
    if term_months == 0 {
        return amount_cop;
    }
    if annual_rate_pct <= 0.0 {
        return amount_cop / term_months as i64;
    }

    let monthly_rate = (1.0 + annual_rate_pct / 100.0).powf(1.0 / 12.0) - 1.0;
    let n = term_months as f64;
    let factor = (1.0 + monthly_rate).powf(n);
    let installment = amount_cop as f64 * (monthly_rate * factor) / (factor - 1.0);

    installment.round() as i64
}

fn guarantees(score: u32, amount_cop: i64) -> &'static str {
    if score >= 750 && amount_cop <= 1_000_000_000 {
        "Pagaré"
    } else if score >= 650 {
        "Pagaré + Aval"
    } else if score >= 550 {
        "Pagaré + Aval + Garantía personal"
    } else if amount_cop >= 500_000_000 {
        "Pagaré + Aval + Garantía real (hipoteca/prenda)"
    } else {
        "Pagaré + Aval + Garantía personal"
    }
}

fn disbursement_days(score: u32, existing_client: bool) -> u32 {
    let mut days: i32 = 7;
    if score >= 750 {
        days -= 3;
    } else if score >= 650 {
        days -= 2;
    }
    if existing_client {
        days -= 1;
    }
    days.max(2) as u32
}

fn applicable_benefits(score: u32, existing_client: bool, amount_cop: i64) -> Vec<String> {
    let mut benefits = Vec::new();

    if score >= 750 {
        benefits.push("Tasa preferencial cliente premium".to_string());
        benefits.push("Proceso expedito (3-4 días)".to_string());
        benefits.push("Sin comisión de estudio".to_string());
    } else if score >= 650 {
        benefits.push("Tasa preferencial cliente establecido".to_string());
        benefits.push("Comisión de estudio con descuento 50%".to_string());
    }

    if existing_client {
        benefits.push("Descuento débito automático (-0.5%)".to_string());
        benefits.push("Seguros preferenciales".to_string());
        benefits.push("Proceso simplificado".to_string());
    }

    if amount_cop >= 1_000_000_000 {
        benefits.push("Descuento por monto significativo (-0.3%)".to_string());
        benefits.push("Asesor dedicado".to_string());
    }

    benefits.push("Seguro de vida incluido".to_string());
    benefits.push("Posibilidad de prepagos sin penalidad".to_string());

    benefits
}

/// Product to offer when the client never named one: explicit request
/// first, then a sector default.
pub fn product_for(requested: Option<ProductKind>, sector: Option<&str>) -> ProductKind {
    if let Some(product) = requested {
        return product;
    }
    match sector {
        Some("comercio") => ProductKind::RevolvingLine,
        _ => ProductKind::BusinessLoan,
    }
}

/// Compute complete offer terms for a pre-approved client.
pub fn build_offer(
    score: u32,
    product: ProductKind,
    requested_cop: Option<i64>,
    recommended_cop: Option<i64>,
    existing_client: bool,
    sector: Option<&str>,
) -> OfferTerms {
    let mut spread = spread_for_score(score);
    if existing_client {
        spread -= 0.5;
    }
    spread += sector_adjustment(sector);

    let ceiling = max_amount(score, product, recommended_cop);
    // The client gets what they asked for, up to the ceiling.
    let approved = requested_cop
        .map(|r| r.min(ceiling))
        .unwrap_or(ceiling);

    let term = term_months(score, product, sector);
    let annual_rate = REFERENCE_DTF_PCT + spread;
    let installment = french_installment(approved, annual_rate, term);

    OfferTerms {
        product,
        approved_amount_cop: approved,
        term_months: term,
        reference_dtf_pct: REFERENCE_DTF_PCT,
        spread_pct: (spread * 100.0).round() / 100.0,
        annual_rate_pct: (annual_rate * 100.0).round() / 100.0,
        monthly_installment_cop: installment,
        guarantees: guarantees(score, approved).to_string(),
        disbursement_days: disbursement_days(score, existing_client),
        benefits: applicable_benefits(score, existing_client, approved),
    }
}

//
// ================= Canned offer replies =================
//

pub fn acceptance_message() -> String {
    "¡Excelente decisión! 🎉\n\n\
     Tu solicitud de crédito está oficialmente en proceso. Estos son los próximos pasos:\n\n\
     📞 **Contacto del Asesor**: Un asesor comercial especializado te contactará en las próximas 24 horas\n\
     📋 **Documentación Final**: Te ayudará con cualquier documento adicional que pueda necesitarse\n\
     ⚡ **Proceso Ágil**: Como ya completaste la pre-aprobación, el proceso será muy rápido\n\
     💰 **Desembolso**: Una vez formalizada la documentación, el desembolso se realizará según los tiempos ofrecidos\n\n\
     ¡Muchas gracias por confiar en nosotros para el crecimiento de tu empresa! 🏦✨"
        .to_string()
}

pub fn decline_message() -> String {
    "¡Perfecto, entiendo completamente! 😊\n\n\
     Quiero que sepas que:\n\n\
     ⏰ **Esta oferta estará disponible por 30 días** por si cambias de opinión\n\
     📞 **Puedes contactarnos cuando quieras** para reactivar tu solicitud\n\
     🔄 **Sin compromiso**: No hay ninguna obligación de tu parte\n\n\
     Si en el futuro tienes otros requerimientos financieros, ¡no dudes en consultarnos!\n\n\
     ¡Que tengas un excelente día! 🌟"
        .to_string()
}

pub fn clarification_message() -> String {
    "Me gustaría asegurarme de entender tu respuesta sobre la oferta que te presenté.\n\n\
     ¿Te interesa **continuar con la oferta** y que un asesor te contacte para formalizar el crédito?\n\n\
     Por favor responde claramente **SÍ** o **NO**. ¿Cuál es tu decisión?"
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spread_bands() {
        assert_eq!(spread_for_score(780), 4.5);
        assert_eq!(spread_for_score(700), 6.0);
        assert_eq!(spread_for_score(600), 7.5);
        assert_eq!(spread_for_score(450), 9.0);
        assert_eq!(spread_for_score(300), 12.0);
    }

    #[test]
    fn test_french_installment() {
        let installment = french_installment(500_000_000, 14.5, 48);
        // Fixed installment must repay principal plus interest.
        assert!(installment > 500_000_000 / 48);
        assert!(installment < 500_000_000);

        assert_eq!(french_installment(120_000_000, 0.0, 12), 10_000_000);
        assert_eq!(french_installment(100, 10.0, 0), 100);
    }

    #[test]
    fn test_offer_respects_requested_amount() {
        let offer = build_offer(
            780,
            ProductKind::BusinessLoan,
            Some(500_000_000),
            None,
            true,
            Some("construccion"),
        );
        assert_eq!(offer.approved_amount_cop, 500_000_000);
        // 4.5 - 0.5 (existing) - 0.3 (construction)
        assert_eq!(offer.spread_pct, 3.7);
        assert_eq!(offer.annual_rate_pct, 12.2);
        assert_eq!(offer.term_months, 60);
        assert_eq!(offer.guarantees, "Pagaré");
        assert_eq!(offer.disbursement_days, 3);
    }

    #[test]
    fn test_offer_clamps_to_ceiling() {
        // Score 600 → 800M ceiling for a business loan.
        let offer = build_offer(
            600,
            ProductKind::BusinessLoan,
            Some(2_000_000_000),
            None,
            false,
            None,
        );
        assert_eq!(offer.approved_amount_cop, 800_000_000);
    }

    #[test]
    fn test_scoring_recommendation_overrides_bands() {
        let offer = build_offer(
            600,
            ProductKind::BusinessLoan,
            Some(2_000_000_000),
            Some(1_200_000_000),
            false,
            None,
        );
        assert_eq!(offer.approved_amount_cop, 1_200_000_000);
    }

    #[test]
    fn test_term_capped_at_product_base() {
        // Agricultural stretch (×1.2) never exceeds the product base term.
        let term = term_months(780, ProductKind::BusinessLoan, Some("agricultura"));
        assert_eq!(term, 60);

        let term = term_months(600, ProductKind::RevolvingLine, None);
        assert_eq!(term, 10);
    }

    #[test]
    fn test_product_defaults_by_sector() {
        assert_eq!(product_for(None, Some("comercio")), ProductKind::RevolvingLine);
        assert_eq!(product_for(None, Some("construccion")), ProductKind::BusinessLoan);
        assert_eq!(
            product_for(Some(ProductKind::Factoring), Some("comercio")),
            ProductKind::Factoring
        );
    }

    #[test]
    fn test_benefits_accumulate() {
        let premium = applicable_benefits(780, true, 1_500_000_000);
        assert!(premium.iter().any(|b| b.contains("premium")));
        assert!(premium.iter().any(|b| b.contains("Asesor dedicado")));

        let basic = applicable_benefits(500, false, 100_000_000);
        assert_eq!(basic.len(), 2);
    }
}
