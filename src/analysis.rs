//! Combined credit analysis
//!
//! Blends the internal scoring result with the bureau assessment into one
//! verdict, sanity-checks requested amounts against the profile, and
//! translates score bands into client-facing language.

use tracing::info;

use crate::models::{
    BureauAssessment, BureauRecommendation, CoherenceCheck, CombinedAssessment, CreditDecision,
};

/// Internal analysis carries more weight than the bureau consultation.
const INTERNAL_WEIGHT_PCT: u32 = 65;
const BUREAU_WEIGHT_PCT: u32 = 35;

/// Blend internal and bureau results into a combined assessment.
pub fn combine_assessments(
    internal_score: Option<u32>,
    internal_decision: CreditDecision,
    bureau: &BureauAssessment,
) -> CombinedAssessment {
    let bureau_score = bureau.bureau_score;

    let combined_score = match (internal_score, bureau_score) {
        (Some(i), Some(b)) => {
            Some((i * INTERNAL_WEIGHT_PCT + b * BUREAU_WEIGHT_PCT) / 100)
        }
        (Some(i), None) => Some(i),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    };

    let final_decision = resolve_decision(
        internal_score,
        bureau_score,
        bureau.recommendation,
        internal_decision,
    );

    let decision_context =
        decision_context(internal_score, bureau_score, bureau.recommendation, final_decision);

    let mut determining_factors: Vec<String> = Vec::new();
    determining_factors.extend(bureau.alerts.iter().take(2).cloned());
    determining_factors.truncate(3);

    info!(
        ?internal_score,
        ?bureau_score,
        decision = %final_decision,
        "Combined credit analysis resolved"
    );

    CombinedAssessment {
        combined_score,
        internal_score,
        bureau_score,
        internal_weight_pct: INTERNAL_WEIGHT_PCT,
        bureau_weight_pct: BUREAU_WEIGHT_PCT,
        final_decision,
        bureau_recommendation: bureau.recommendation,
        decision_context,
        determining_factors,
        critical_alerts: bureau.alerts.clone(),
    }
}

/// Decision matrix. Hard rejections first, then graded bands; the bureau's
/// recommendation can rescue borderline profiles into Conditional.
fn resolve_decision(
    internal_score: Option<u32>,
    bureau_score: Option<u32>,
    recommendation: BureauRecommendation,
    internal_decision: CreditDecision,
) -> CreditDecision {
    if internal_decision == CreditDecision::Rejected {
        return CreditDecision::Rejected;
    }
    if recommendation.is_blocking() {
        return CreditDecision::Rejected;
    }

    // Internal score is mandatory for any approval.
    let Some(internal) = internal_score else {
        return CreditDecision::Rejected;
    };

    // No bureau history caps the outcome at Conditional.
    let Some(bureau) = bureau_score else {
        return if internal >= 550 {
            CreditDecision::Conditional
        } else {
            CreditDecision::Rejected
        };
    };

    match (internal, bureau) {
        (i, b) if i >= 700 && b >= 700 => CreditDecision::Approved,
        (i, b) if i >= 700 && b >= 600 => CreditDecision::Conditional,
        (i, b) if i >= 650 && b >= 650 => CreditDecision::Conditional,
        (i, b) if i >= 600 && b >= 600 => {
            if recommendation.is_favorable() || recommendation == BureauRecommendation::Observe {
                CreditDecision::Conditional
            } else {
                CreditDecision::Rejected
            }
        }
        (i, _) if i >= 550 => {
            if recommendation.is_favorable() {
                CreditDecision::Conditional
            } else {
                CreditDecision::Rejected
            }
        }
        _ => CreditDecision::Rejected,
    }
}

fn decision_context(
    internal_score: Option<u32>,
    bureau_score: Option<u32>,
    recommendation: BureauRecommendation,
    decision: CreditDecision,
) -> String {
    match decision {
        CreditDecision::Approved => format!(
            "Perfiles excelentes: interno {}, buró {}",
            internal_score.unwrap_or(0),
            bureau_score.unwrap_or(0)
        ),
        CreditDecision::Conditional => match bureau_score {
            Some(b) if b < 650 => format!(
                "Score interno sólido ({}) compensa score buró ({}). Recomendación buró: {:?}",
                internal_score.unwrap_or(0),
                b,
                recommendation
            ),
            _ => "Perfiles buenos que ameritan aprobación con condiciones".to_string(),
        },
        _ => "Perfiles por debajo de umbrales mínimos o alertas críticas".to_string(),
    }
}

//
// ================= Coherence =================
//

const SECTOR_MULTIPLIERS: &[(&str, f64)] = &[
    ("construccion", 1.3),
    ("manufactura", 1.0),
    ("comercio", 0.8),
    ("servicios", 0.9),
    ("tecnologia", 0.7),
    ("agricultura", 1.1),
];

fn expected_ceiling_for_score(score: u32) -> i64 {
    if score >= 750 {
        2_500_000_000
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

/// Sanity-check a requested amount against the profile. Flags, never
/// blocks: the final word belongs to the analysis flow.
pub fn check_coherence(
    requested_cop: i64,
    internal_score: u32,
    sector: Option<&str>,
    existing_client: bool,
) -> CoherenceCheck {
    let base = expected_ceiling_for_score(internal_score);

    let multiplier = sector
        .and_then(|s| {
            SECTOR_MULTIPLIERS
                .iter()
                .find(|(name, _)| *name == s)
                .map(|(_, m)| *m)
        })
        .unwrap_or(1.0);

    let mut ceiling = (base as f64 * multiplier) as i64;
    if existing_client {
        ceiling = (ceiling as f64 * 1.2) as i64;
    }

    let ratio = requested_cop as f64 / ceiling as f64;

    if ratio <= 1.0 {
        CoherenceCheck {
            coherent: true,
            ratio,
            note: "Solicitud dentro del rango esperado".to_string(),
            suggested_amount_cop: None,
        }
    } else if ratio <= 1.5 {
        CoherenceCheck {
            coherent: true,
            ratio,
            note: "Solicitud alta pero posible. Revisar capacidad de pago en detalle".to_string(),
            suggested_amount_cop: Some(ceiling),
        }
    } else {
        CoherenceCheck {
            coherent: false,
            ratio,
            note: format!(
                "Monto solicitado (${}M) muy alto para el perfil crediticio",
                requested_cop / 1_000_000
            ),
            suggested_amount_cop: Some(ceiling),
        }
    }
}

//
// ================= Client-facing wording =================
//

/// Friendly wording for an internal profile, so agents never quote raw
/// scores or grade codes at the client.
pub fn friendly_client_profile(score: Option<u32>, grade: Option<&str>) -> &'static str {
    let score = score.unwrap_or(0);
    let grade = grade.unwrap_or("");

    if score >= 750 || matches!(grade, "A1" | "A2") {
        "cliente preferencial con excelente historial comercial"
    } else if score >= 650 || matches!(grade, "B1" | "B+") {
        "cliente establecido con buen comportamiento comercial"
    } else if score >= 600 || matches!(grade, "B2" | "BBB+") {
        "cliente con relación comercial sólida"
    } else if score >= 500 || matches!(grade, "BBB" | "C1") {
        "cliente en desarrollo con potencial de crecimiento"
    } else if score >= 400 || matches!(grade, "C2" | "BB") {
        "cliente que requiere evaluación personalizada"
    } else {
        "cliente que requiere análisis detallado"
    }
}

fn describe_internal_score(score: u32) -> &'static str {
    if score >= 750 {
        "indicadores financieros excelentes con muy buena capacidad de pago"
    } else if score >= 650 {
        "indicadores financieros sólidos y capacidad de pago adecuada"
    } else if score >= 550 {
        "indicadores financieros aceptables"
    } else {
        "indicadores financieros que requieren fortalecimiento"
    }
}

fn describe_bureau_score(score: Option<u32>) -> &'static str {
    match score {
        Some(s) if s >= 700 => "excelente comportamiento crediticio en el sistema financiero",
        Some(s) if s >= 650 => "buen historial crediticio sin mayores incidencias",
        Some(s) if s >= 600 => "comportamiento crediticio aceptable",
        Some(_) => "historial crediticio con algunas observaciones",
        None => "empresa nueva sin historial crediticio previo (no es negativo)",
    }
}

/// Explanation of the dual analysis without raw scores, used verbatim in
/// the final summary the client sees.
pub fn dual_analysis_summary(
    internal_score: u32,
    bureau_score: Option<u32>,
    decision: CreditDecision,
    existing_client: bool,
) -> String {
    let mut summary = format!(
        "📊 **Análisis Interno**: Basado en tus estados financieros, tu empresa presenta {}.\n\n\
         🏦 **Consulta de Centrales de Riesgo**: Según tu historial en el sistema financiero colombiano, {}.",
        describe_internal_score(internal_score),
        describe_bureau_score(bureau_score),
    );

    if existing_client {
        summary.push_str(
            "\n\n⭐ **Ventaja Adicional**: Como cliente existente, tienes condiciones preferenciales.",
        );
    }

    match decision {
        CreditDecision::Approved => summary.push_str(
            "\n\n✅ **Resultado Final**: ¡APROBADO! La combinación de ambos análisis respalda tu solicitud.",
        ),
        CreditDecision::Conditional => summary.push_str(
            "\n\n⚠️ **Resultado Final**: APROBADO con condiciones especiales para mitigar riesgos identificados.",
        ),
        _ => summary.push_str(
            "\n\n❌ **Resultado Final**: No aprobado en este momento. Te explicamos las razones y alternativas.",
        ),
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bureau_with(score: Option<u32>, recommendation: BureauRecommendation) -> BureauAssessment {
        BureauAssessment {
            bureau_score: score,
            recommendation,
            ..BureauAssessment::default()
        }
    }

    #[test]
    fn test_both_excellent_approves() {
        let bureau = bureau_with(Some(745), BureauRecommendation::Favorable);
        let combined = combine_assessments(Some(780), CreditDecision::Approved, &bureau);
        assert_eq!(combined.final_decision, CreditDecision::Approved);
        // 780*65 + 745*35 = 50700+26075 = 76775 → 767
        assert_eq!(combined.combined_score, Some(767));
    }

    #[test]
    fn test_blocking_recommendation_rejects() {
        let bureau = bureau_with(Some(720), BureauRecommendation::Unfavorable);
        let combined = combine_assessments(Some(780), CreditDecision::Approved, &bureau);
        assert_eq!(combined.final_decision, CreditDecision::Rejected);
    }

    #[test]
    fn test_missing_internal_score_rejects() {
        let bureau = bureau_with(Some(700), BureauRecommendation::Favorable);
        let combined = combine_assessments(None, CreditDecision::Pending, &bureau);
        assert_eq!(combined.final_decision, CreditDecision::Rejected);
    }

    #[test]
    fn test_no_bureau_history_caps_at_conditional() {
        let bureau = bureau_with(None, BureauRecommendation::Analyze);
        let combined = combine_assessments(Some(760), CreditDecision::Approved, &bureau);
        assert_eq!(combined.final_decision, CreditDecision::Conditional);
        assert_eq!(combined.combined_score, Some(760));
    }

    #[test]
    fn test_borderline_rescued_by_favorable_bureau() {
        let bureau = bureau_with(Some(590), BureauRecommendation::Favorable);
        let combined = combine_assessments(Some(560), CreditDecision::Conditional, &bureau);
        assert_eq!(combined.final_decision, CreditDecision::Conditional);

        let harsh = bureau_with(Some(590), BureauRecommendation::Observe);
        let combined = combine_assessments(Some(560), CreditDecision::Conditional, &harsh);
        assert_eq!(combined.final_decision, CreditDecision::Rejected);
    }

    #[test]
    fn test_internal_rejection_is_final() {
        let bureau = bureau_with(Some(745), BureauRecommendation::Favorable);
        let combined = combine_assessments(Some(720), CreditDecision::Rejected, &bureau);
        assert_eq!(combined.final_decision, CreditDecision::Rejected);
    }

    #[test]
    fn test_coherence_within_range() {
        let check = check_coherence(500_000_000, 700, Some("manufactura"), false);
        assert!(check.coherent);
        assert!(check.suggested_amount_cop.is_none());
    }

    #[test]
    fn test_coherence_high_but_possible() {
        // Ceiling for 700 in manufactura: 1.500M; 2.000M is ratio ~1.33.
        let check = check_coherence(2_000_000_000, 700, Some("manufactura"), false);
        assert!(check.coherent);
        assert_eq!(check.suggested_amount_cop, Some(1_500_000_000));
    }

    #[test]
    fn test_coherence_incoherent() {
        let check = check_coherence(5_000_000_000, 600, Some("tecnologia"), false);
        assert!(!check.coherent);
        assert!(check.suggested_amount_cop.is_some());
        assert!(check.ratio > 1.5);
    }

    #[test]
    fn test_existing_client_uplift() {
        // 650 → 1.500M base, comercio ×0.8 = 1.200M, existing ×1.2 = 1.440M.
        let check = check_coherence(1_400_000_000, 650, Some("comercio"), true);
        assert!(check.coherent);
        assert!(check.ratio <= 1.0);
    }

    #[test]
    fn test_friendly_profile_bands() {
        assert_eq!(
            friendly_client_profile(Some(780), Some("A1")),
            "cliente preferencial con excelente historial comercial"
        );
        assert_eq!(
            friendly_client_profile(Some(620), Some("B2")),
            "cliente con relación comercial sólida"
        );
        assert_eq!(
            friendly_client_profile(None, None),
            "cliente que requiere análisis detallado"
        );
    }

    #[test]
    fn test_dual_summary_mentions_no_raw_scores() {
        let summary = dual_analysis_summary(720, Some(690), CreditDecision::Approved, true);
        assert!(summary.contains("APROBADO"));
        assert!(summary.contains("cliente existente"));
        assert!(!summary.contains("720"));
        assert!(!summary.contains("690"));
    }
}
