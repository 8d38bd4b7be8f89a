//! Internal client directory (simulated)
//!
//! Stands in for the lender's core-banking lookup. Static fixture data;
//! real integrations would implement the same trait.

use std::collections::HashMap;

use crate::extract::normalize_nit;

/// One company as the lender knows it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientRecord {
    pub tax_id: String,
    pub name: String,
    pub existing_client: bool,
    pub member_since: Option<&'static str>,
    pub relationship_years: u32,
    pub sector: Option<&'static str>,
    pub city: Option<&'static str>,
    pub products: Vec<&'static str>,
    pub internal_score: Option<u32>,
    pub risk_grade: Option<&'static str>,
    pub relationship_quality: Option<&'static str>,
    pub avg_monthly_income_cop: Option<i64>,
    pub estimated_equity_cop: Option<i64>,
    pub credit_experience: Option<&'static str>,
    pub benefits: Vec<&'static str>,
    pub account_manager: Option<&'static str>,
    pub manager_phone: Option<&'static str>,
    pub notes: Option<&'static str>,
}

impl ClientRecord {
    fn not_a_client(tax_id: &str) -> Self {
        Self {
            tax_id: tax_id.to_string(),
            name: "Empresa no identificada".to_string(),
            existing_client: false,
            notes: Some("NIT no encontrado en nuestra base de datos"),
            ..Self::default()
        }
    }
}

/// Lookup seam; the orchestrator only sees this trait.
pub trait ClientDirectory: Send + Sync {
    /// Look up a company by NIT. Unknown NITs yield a not-a-client record
    /// rather than an error: an unknown company is a prospect, not a fault.
    fn lookup(&self, tax_id: &str) -> ClientRecord;
}

/// In-memory directory seeded with the demo portfolio.
pub struct InMemoryDirectory {
    records: HashMap<&'static str, ClientRecord>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        let mut records = HashMap::new();

        records.insert(
            "900123456-7",
            ClientRecord {
                tax_id: "900123456-7".to_string(),
                name: "Constructora Los Andes S.A.S".to_string(),
                existing_client: true,
                member_since: Some("2019-03-15"),
                relationship_years: 5,
                sector: Some("construccion"),
                city: Some("Bogotá"),
                products: vec![
                    "Cuenta Corriente Empresarial",
                    "CDT $200M",
                    "Crédito Rotativo $300M",
                ],
                internal_score: Some(780),
                risk_grade: Some("A1"),
                relationship_quality: Some("Excelente"),
                avg_monthly_income_cop: Some(2_500_000_000),
                estimated_equity_cop: Some(8_000_000_000),
                credit_experience: Some("5 créditos pagados sin novedad"),
                benefits: vec![
                    "Tasa preferencial (-1.5%)",
                    "Débito automático (-0.5% adicional)",
                    "Proceso expedito (48 horas)",
                    "Sin comisión de estudio",
                    "Seguro de vida gratis",
                ],
                account_manager: Some("María Fernández - Gerente Corporativo"),
                manager_phone: Some("601-234-5678"),
                notes: Some("Cliente premium con excelente comportamiento de pago."),
            },
        );

        records.insert(
            "800987654-3",
            ClientRecord {
                tax_id: "800987654-3".to_string(),
                name: "Textiles del Valle Ltda".to_string(),
                existing_client: true,
                member_since: Some("2021-08-10"),
                relationship_years: 3,
                sector: Some("manufactura"),
                city: Some("Cali"),
                products: vec![
                    "Cuenta Corriente",
                    "Factoring $150M",
                    "Tarjeta Crédito Empresarial",
                ],
                internal_score: Some(680),
                risk_grade: Some("B1"),
                relationship_quality: Some("Buena"),
                avg_monthly_income_cop: Some(800_000_000),
                estimated_equity_cop: Some(2_500_000_000),
                credit_experience: Some("2 créditos activos, 1 mora leve hace 8 meses"),
                benefits: vec![
                    "Débito automático (-0.5%)",
                    "Proceso preferencial",
                    "Descuento 25% comisión estudio",
                ],
                account_manager: Some("Carlos Ruiz - Ejecutivo PYME"),
                manager_phone: Some("602-345-6789"),
                notes: Some("Cliente con potencial de crecimiento."),
            },
        );

        records.insert(
            "700456789-1",
            ClientRecord {
                tax_id: "700456789-1".to_string(),
                name: "Distribuidora del Caribe S.A".to_string(),
                existing_client: true,
                member_since: Some("2022-11-20"),
                relationship_years: 2,
                sector: Some("comercio"),
                city: Some("Barranquilla"),
                products: vec!["Cuenta Corriente", "Datafonos"],
                internal_score: Some(620),
                risk_grade: Some("B2"),
                relationship_quality: Some("Regular"),
                avg_monthly_income_cop: Some(450_000_000),
                estimated_equity_cop: Some(900_000_000),
                credit_experience: Some("Cliente nuevo en productos crediticios"),
                benefits: vec!["Proceso preferencial", "Asesoría financiera gratuita"],
                account_manager: Some("Ana Vargas - Ejecutiva Comercial"),
                manager_phone: Some("605-456-7890"),
                notes: Some("Cliente en construcción de relación comercial."),
            },
        );

        records.insert(
            "600789123-4",
            ClientRecord {
                tax_id: "600789123-4".to_string(),
                name: "Agropecuaria El Dorado S.A.S".to_string(),
                existing_client: true,
                member_since: Some("2018-05-22"),
                relationship_years: 6,
                sector: Some("agricultura"),
                city: Some("Villavicencio"),
                products: vec![
                    "Cuenta Corriente",
                    "CDT $100M",
                    "Crédito Agrícola $400M",
                ],
                internal_score: Some(720),
                risk_grade: Some("A2"),
                relationship_quality: Some("Muy Buena"),
                avg_monthly_income_cop: Some(600_000_000),
                estimated_equity_cop: Some(5_000_000_000),
                credit_experience: Some("Cliente tradicional del sector, pagos estacionales"),
                benefits: vec![
                    "Tasa preferencial sector (-1%)",
                    "Débito automático (-0.5%)",
                    "Períodos de gracia estacionales",
                    "Sin comisión estudio",
                ],
                account_manager: Some("Roberto Molina - Especialista Agro"),
                manager_phone: Some("608-567-8901"),
                notes: Some("Comportamiento estacional predecible y responsable."),
            },
        );

        // Known prospects (not clients)
        records.insert(
            "500234567-8",
            ClientRecord {
                tax_id: "500234567-8".to_string(),
                name: "Innovaciones Tecnológicas SAS".to_string(),
                existing_client: false,
                sector: Some("tecnologia"),
                city: Some("Medellín"),
                notes: Some("Startup constituida hace 8 meses, sin historial con la entidad"),
                ..ClientRecord::default()
            },
        );

        records.insert(
            "400345678-9",
            ClientRecord {
                tax_id: "400345678-9".to_string(),
                name: "Transporte y Logística Nacional Ltda".to_string(),
                existing_client: false,
                sector: Some("transporte"),
                city: Some("Bogotá"),
                notes: Some("Empresa establecida del mercado, cliente potencial"),
                ..ClientRecord::default()
            },
        );

        Self { records }
    }
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientDirectory for InMemoryDirectory {
    fn lookup(&self, tax_id: &str) -> ClientRecord {
        let normalized = normalize_nit(tax_id);
        self.records
            .get(normalized.as_str())
            .cloned()
            .unwrap_or_else(|| ClientRecord::not_a_client(&normalized))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_existing_client() {
        let directory = InMemoryDirectory::new();
        let record = directory.lookup("900123456-7");
        assert!(record.existing_client);
        assert_eq!(record.name, "Constructora Los Andes S.A.S");
        assert_eq!(record.internal_score, Some(780));
        assert_eq!(record.benefits.len(), 5);
    }

    #[test]
    fn test_lookup_normalizes_nit() {
        let directory = InMemoryDirectory::new();
        // Bare and dotted forms resolve to the same record.
        assert!(directory.lookup("9001234567").existing_client);
        assert!(directory.lookup("900.123.456-7").existing_client);
    }

    #[test]
    fn test_lookup_known_prospect() {
        let directory = InMemoryDirectory::new();
        let record = directory.lookup("500234567-8");
        assert!(!record.existing_client);
        assert_eq!(record.sector, Some("tecnologia"));
    }

    #[test]
    fn test_lookup_unknown_nit() {
        let directory = InMemoryDirectory::new();
        let record = directory.lookup("111222333-4");
        assert!(!record.existing_client);
        assert_eq!(record.name, "Empresa no identificada");
    }
}
