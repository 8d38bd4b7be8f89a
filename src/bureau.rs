//! Simulated credit-bureau gateway
//!
//! Mimics a Colombian risk-central consultation (DataCrédito style). The
//! reports are fixtures; a real integration would implement `CreditBureau`.

use std::collections::HashMap;

use crate::extract::normalize_nit;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DebtDetail {
    pub bank: &'static str,
    pub amount_cop: i64,
    pub product: &'static str,
    pub behavior: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemDebts {
    pub total_cop: i64,
    pub entity_count: u32,
    pub per_entity: Vec<DebtDetail>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NegativeReport {
    pub date: &'static str,
    pub entity: &'static str,
    pub amount_cop: i64,
    pub kind: &'static str,
    pub status: &'static str,
    pub note: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegalProcess {
    pub date: &'static str,
    pub entity: &'static str,
    pub amount_cop: i64,
    pub status: &'static str,
    pub court: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lien {
    pub date: &'static str,
    pub kind: &'static str,
    pub amount_cop: i64,
    pub asset: &'static str,
}

/// Full bureau report for one company.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BureauReport {
    pub tax_id: String,
    pub consulted_entity: &'static str,
    pub consulted_at: &'static str,
    pub external_score: Option<u32>,
    pub risk_category: &'static str,
    pub rating: &'static str,
    pub behavior_12m: &'static str,
    pub behavior_24m: &'static str,
    pub payment_history: &'static str,
    pub system_debts: SystemDebts,
    pub negative_reports: Vec<NegativeReport>,
    pub executive_claims: Vec<LegalProcess>,
    pub active_liens: Vec<Lien>,
    pub credit_experience: &'static str,
    pub last_updated: &'static str,
    pub bureau_notes: &'static str,
    pub bureau_recommendation: &'static str,
    pub alerts: Vec<&'static str>,
    pub industry_score_note: &'static str,
}

impl BureauReport {
    /// Report for a company with no footprint in the risk centrals. Not a
    /// negative signal, but it limits what can be evaluated.
    fn no_history(tax_id: &str) -> Self {
        Self {
            tax_id: tax_id.to_string(),
            consulted_entity: "DataCrédito Experian",
            consulted_at: "hoy",
            external_score: None,
            risk_category: "SIN INFORMACIÓN",
            rating: "NR",
            behavior_12m: "Sin información",
            behavior_24m: "Sin información",
            payment_history: "Empresa sin historial en centrales de riesgo",
            credit_experience: "Sin experiencia reportada",
            last_updated: "N/A",
            bureau_notes: "Empresa sin información en centrales de riesgo",
            bureau_recommendation: "ANALIZAR - Sin historial crediticio para evaluar",
            alerts: vec!["Sin información en centrales de riesgo"],
            industry_score_note: "Sin referencia",
            ..Self::default()
        }
    }

    pub fn has_history(&self) -> bool {
        self.external_score.is_some()
    }
}

/// Consultation seam; the orchestrator only sees this trait.
pub trait CreditBureau: Send + Sync {
    fn report(&self, tax_id: &str) -> BureauReport;
}

/// Score bands per Colombian bureau conventions.
pub fn interpret_score(score: Option<u32>) -> &'static str {
    match score {
        None => "Sin información suficiente",
        Some(s) if s >= 700 => "Excelente - Muy bajo riesgo",
        Some(s) if s >= 650 => "Bueno - Riesgo bajo",
        Some(s) if s >= 600 => "Aceptable - Riesgo medio-bajo",
        Some(s) if s >= 550 => "Regular - Riesgo medio",
        Some(s) if s >= 450 => "Deficiente - Riesgo alto",
        Some(_) => "Malo - Riesgo muy alto",
    }
}

/// In-memory bureau seeded with the demo reports.
pub struct SimulatedBureau {
    reports: HashMap<&'static str, BureauReport>,
}

impl SimulatedBureau {
    pub fn new() -> Self {
        let mut reports = HashMap::new();

        reports.insert(
            "900123456-7",
            BureauReport {
                tax_id: "900123456-7".to_string(),
                consulted_entity: "DataCrédito Experian",
                consulted_at: "2024-09-12",
                external_score: Some(745),
                risk_category: "A1",
                rating: "AA",
                behavior_12m: "Normal",
                behavior_24m: "Normal",
                payment_history: "Cumplidor en todas las obligaciones últimos 24 meses",
                system_debts: SystemDebts {
                    total_cop: 850_000_000,
                    entity_count: 4,
                    per_entity: vec![
                        DebtDetail {
                            bank: "Banco de Bogotá",
                            amount_cop: 400_000_000,
                            product: "Crédito Comercial",
                            behavior: "Normal",
                        },
                        DebtDetail {
                            bank: "Bancolombia",
                            amount_cop: 250_000_000,
                            product: "Leasing",
                            behavior: "Normal",
                        },
                        DebtDetail {
                            bank: "Davivienda",
                            amount_cop: 150_000_000,
                            product: "Tarjeta Crédito",
                            behavior: "Normal",
                        },
                        DebtDetail {
                            bank: "NUESTRA ENTIDAD",
                            amount_cop: 50_000_000,
                            product: "Rotativo",
                            behavior: "Normal",
                        },
                    ],
                },
                credit_experience: "15 años en sistema financiero",
                last_updated: "2024-09-10",
                bureau_notes: "Empresa sólida con excelente comportamiento crediticio histórico",
                bureau_recommendation: "FAVORABLE - Sin restricciones para otorgamiento de crédito",
                industry_score_note: "Por encima del promedio del sector construcción (720)",
                ..BureauReport::default()
            },
        );

        reports.insert(
            "800987654-3",
            BureauReport {
                tax_id: "800987654-3".to_string(),
                consulted_entity: "DataCrédito Experian",
                consulted_at: "2024-09-12",
                external_score: Some(625),
                risk_category: "B1",
                rating: "A-",
                behavior_12m: "Normal con 1 incidencia menor",
                behavior_24m: "Normal",
                payment_history: "1 mora de 18 días en marzo 2024, resto normal",
                system_debts: SystemDebts {
                    total_cop: 320_000_000,
                    entity_count: 3,
                    per_entity: vec![
                        DebtDetail {
                            bank: "Bancolombia",
                            amount_cop: 180_000_000,
                            product: "Crédito Comercial",
                            behavior: "Normal",
                        },
                        DebtDetail {
                            bank: "NUESTRA ENTIDAD",
                            amount_cop: 100_000_000,
                            product: "Factoring",
                            behavior: "Normal",
                        },
                        DebtDetail {
                            bank: "Banco Popular",
                            amount_cop: 40_000_000,
                            product: "Tarjeta Crédito",
                            behavior: "Mora reportada marzo 2024",
                        },
                    ],
                },
                negative_reports: vec![NegativeReport {
                    date: "2024-03-15",
                    entity: "Banco Popular",
                    amount_cop: 40_000_000,
                    kind: "Mora mayor a 15 días",
                    status: "Normalizada",
                    note: "Mora de 18 días, normalizada el 2024-04-02",
                }],
                credit_experience: "8 años en sistema financiero",
                last_updated: "2024-09-08",
                bureau_notes: "Comportamiento general bueno, incidencia menor ya normalizada",
                bureau_recommendation: "FAVORABLE CON OBSERVACIONES - Considerar mora menor reciente",
                alerts: vec!["Mora normalizada hace 5 meses"],
                industry_score_note: "En promedio del sector textil (630)",
                ..BureauReport::default()
            },
        );

        reports.insert(
            "700456789-1",
            BureauReport {
                tax_id: "700456789-1".to_string(),
                consulted_entity: "DataCrédito Experian",
                consulted_at: "2024-09-12",
                external_score: Some(580),
                risk_category: "B2",
                rating: "BBB+",
                behavior_12m: "Normal",
                behavior_24m: "Información limitada",
                payment_history: "Experiencia crediticia limitada, pagos normales en productos básicos",
                system_debts: SystemDebts {
                    total_cop: 85_000_000,
                    entity_count: 2,
                    per_entity: vec![
                        DebtDetail {
                            bank: "NUESTRA ENTIDAD",
                            amount_cop: 50_000_000,
                            product: "Sobregiro",
                            behavior: "Normal",
                        },
                        DebtDetail {
                            bank: "Banco Agrario",
                            amount_cop: 35_000_000,
                            product: "Microcrédito",
                            behavior: "Normal",
                        },
                    ],
                },
                credit_experience: "3 años en sistema financiero",
                last_updated: "2024-09-05",
                bureau_notes: "Empresa en construcción de historial crediticio, sin incidencias",
                bureau_recommendation: "FAVORABLE - Empresa emergente sin antecedentes negativos",
                alerts: vec!["Historial crediticio corto"],
                industry_score_note: "Levemente bajo para sector comercio (600)",
                ..BureauReport::default()
            },
        );

        reports.insert(
            "600789123-4",
            BureauReport {
                tax_id: "600789123-4".to_string(),
                consulted_entity: "DataCrédito Experian",
                consulted_at: "2024-09-12",
                external_score: Some(690),
                risk_category: "A2",
                rating: "A",
                behavior_12m: "Normal",
                behavior_24m: "Normal con estacionalidad",
                payment_history: "Comportamiento estacional típico del sector, cumplidor",
                system_debts: SystemDebts {
                    total_cop: 1_200_000_000,
                    entity_count: 3,
                    per_entity: vec![
                        DebtDetail {
                            bank: "Banco Agrario",
                            amount_cop: 600_000_000,
                            product: "Crédito Agrícola",
                            behavior: "Normal",
                        },
                        DebtDetail {
                            bank: "NUESTRA ENTIDAD",
                            amount_cop: 400_000_000,
                            product: "Crédito Comercial",
                            behavior: "Normal",
                        },
                        DebtDetail {
                            bank: "Finagro",
                            amount_cop: 200_000_000,
                            product: "Redescuento",
                            behavior: "Normal",
                        },
                    ],
                },
                credit_experience: "12 años en sistema financiero",
                last_updated: "2024-09-07",
                bureau_notes: "Empresa del sector agropecuario con comportamiento responsable",
                bureau_recommendation: "FAVORABLE - Empresa consolidada del sector agropecuario",
                industry_score_note: "Por encima del promedio del sector agropecuario (665)",
                ..BureauReport::default()
            },
        );

        reports.insert(
            "400345678-9",
            BureauReport {
                tax_id: "400345678-9".to_string(),
                consulted_entity: "DataCrédito Experian",
                consulted_at: "2024-09-12",
                external_score: Some(450),
                risk_category: "C2",
                rating: "BB",
                behavior_12m: "Irregular",
                behavior_24m: "Regular con incidencias",
                payment_history: "3 moras mayores a 30 días en últimos 18 meses, 1 normalizada",
                system_debts: SystemDebts {
                    total_cop: 750_000_000,
                    entity_count: 4,
                    per_entity: vec![
                        DebtDetail {
                            bank: "Banco de Bogotá",
                            amount_cop: 350_000_000,
                            product: "Crédito Comercial",
                            behavior: "Mora 45 días",
                        },
                        DebtDetail {
                            bank: "Bancolombia",
                            amount_cop: 200_000_000,
                            product: "Leasing Vehículos",
                            behavior: "Normal",
                        },
                        DebtDetail {
                            bank: "Davivienda",
                            amount_cop: 150_000_000,
                            product: "Capital de Trabajo",
                            behavior: "Normalizada",
                        },
                        DebtDetail {
                            bank: "Banco Popular",
                            amount_cop: 50_000_000,
                            product: "Tarjeta Crédito",
                            behavior: "Mora 15 días",
                        },
                    ],
                },
                negative_reports: vec![
                    NegativeReport {
                        date: "2024-07-20",
                        entity: "Banco de Bogotá",
                        amount_cop: 350_000_000,
                        kind: "Mora mayor a 30 días",
                        status: "Vigente",
                        note: "Mora de 45 días vigente",
                    },
                    NegativeReport {
                        date: "2023-11-10",
                        entity: "Davivienda",
                        amount_cop: 150_000_000,
                        kind: "Mora mayor a 60 días",
                        status: "Normalizada",
                        note: "Mora normalizada en enero 2024",
                    },
                ],
                credit_experience: "6 años en sistema financiero",
                last_updated: "2024-09-09",
                bureau_notes: "Dificultades de flujo de caja recientes, mora vigente significativa",
                bureau_recommendation: "DESFAVORABLE - Mora vigente y comportamiento irregular",
                alerts: vec![
                    "Mora vigente superior a 30 días",
                    "Comportamiento irregular últimos 18 meses",
                ],
                industry_score_note: "Por debajo del promedio del sector transporte (510)",
                ..BureauReport::default()
            },
        );

        reports.insert(
            "100987654-3",
            BureauReport {
                tax_id: "100987654-3".to_string(),
                consulted_entity: "DataCrédito Experian",
                consulted_at: "2024-09-12",
                external_score: Some(280),
                risk_category: "D",
                rating: "C",
                behavior_12m: "Deficiente",
                behavior_24m: "Deficiente",
                payment_history: "Múltiples moras, demanda ejecutiva vigente",
                system_debts: SystemDebts {
                    total_cop: 450_000_000,
                    entity_count: 3,
                    per_entity: vec![
                        DebtDetail {
                            bank: "Banco de Bogotá",
                            amount_cop: 250_000_000,
                            product: "Crédito Comercial",
                            behavior: "En demanda",
                        },
                        DebtDetail {
                            bank: "Bancolombia",
                            amount_cop: 150_000_000,
                            product: "Capital de Trabajo",
                            behavior: "Mora 120 días",
                        },
                        DebtDetail {
                            bank: "Davivienda",
                            amount_cop: 50_000_000,
                            product: "Sobregiro",
                            behavior: "Castigado",
                        },
                    ],
                },
                negative_reports: vec![NegativeReport {
                    date: "2024-02-15",
                    entity: "Banco de Bogotá",
                    amount_cop: 250_000_000,
                    kind: "Demanda ejecutiva",
                    status: "Vigente",
                    note: "Proceso ejecutivo en curso",
                }],
                executive_claims: vec![LegalProcess {
                    date: "2024-02-15",
                    entity: "Banco de Bogotá",
                    amount_cop: 250_000_000,
                    status: "En proceso",
                    court: "Juzgado 15 Civil Circuito Bogotá",
                }],
                active_liens: vec![Lien {
                    date: "2024-03-10",
                    kind: "Embargo preventivo",
                    amount_cop: 250_000_000,
                    asset: "Cuenta corriente",
                }],
                credit_experience: "4 años en sistema financiero",
                last_updated: "2024-09-11",
                bureau_notes: "Situación financiera crítica con procesos legales vigentes",
                bureau_recommendation: "RECHAZAR - Alto riesgo crediticio",
                alerts: vec![
                    "Demanda ejecutiva vigente",
                    "Embargo preventivo",
                    "Múltiples moras",
                ],
                industry_score_note: "Muy por debajo del promedio sectorial",
                ..BureauReport::default()
            },
        );

        Self { reports }
    }
}

impl Default for SimulatedBureau {
    fn default() -> Self {
        Self::new()
    }
}

impl CreditBureau for SimulatedBureau {
    fn report(&self, tax_id: &str) -> BureauReport {
        let normalized = normalize_nit(tax_id);
        self.reports
            .get(normalized.as_str())
            .cloned()
            .unwrap_or_else(|| BureauReport::no_history(&normalized))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_existing() {
        let bureau = SimulatedBureau::new();
        let report = bureau.report("900123456-7");
        assert_eq!(report.external_score, Some(745));
        assert!(report.has_history());
        assert!(report.negative_reports.is_empty());
    }

    #[test]
    fn test_report_normalizes_nit() {
        let bureau = SimulatedBureau::new();
        assert!(bureau.report("9001234567").has_history());
    }

    #[test]
    fn test_no_history_report() {
        let bureau = SimulatedBureau::new();
        let report = bureau.report("999888777-6");
        assert!(!report.has_history());
        assert_eq!(report.rating, "NR");
        assert_eq!(report.alerts.len(), 1);
    }

    #[test]
    fn test_interpret_score_bands() {
        assert_eq!(interpret_score(Some(745)), "Excelente - Muy bajo riesgo");
        assert_eq!(interpret_score(Some(660)), "Bueno - Riesgo bajo");
        assert_eq!(interpret_score(Some(580)), "Regular - Riesgo medio");
        assert_eq!(interpret_score(Some(300)), "Malo - Riesgo muy alto");
        assert_eq!(interpret_score(None), "Sin información suficiente");
    }
}
