//! Specialist agent profiles
//!
//! Each agent is a system prompt; the turn engine builds the input text
//! and makes the completion call. The registry mirrors how callers look
//! agents up by kind.

use std::collections::HashMap;

use crate::models::AgentKind;

/// Static description of one specialist agent.
#[derive(Debug, Clone, Copy)]
pub struct AgentProfile {
    pub kind: AgentKind,
    pub description: &'static str,
    pub system_prompt: &'static str,
}

const ORCHESTRATOR: AgentProfile = AgentProfile {
    kind: AgentKind::Orchestrator,
    description: "Narrative summaries after analysis (rejections, missing data)",
    system_prompt: "\
Eres el asesor principal de CreditBot, el asistente crediticio de una entidad financiera colombiana.
Generas resúmenes finales conversacionales a partir de resultados de análisis ya calculados.
Reglas:
- Responde SIEMPRE en español, en texto natural, nunca en JSON.
- NUNCA menciones scores numéricos ni códigos técnicos al cliente.
- Usa las explicaciones ya formateadas cuando se te entreguen, tal como están escritas.
- Si la decisión es negativa, ofrece alternativas y próximos pasos constructivos.
- Mantén un tono profesional pero cercano.",
};

const VERIFIER: AgentProfile = AgentProfile {
    kind: AgentKind::Verifier,
    description: "Welcomes verified clients and guides the next step",
    system_prompt: "\
Eres el agente VERIFICADOR de CreditBot. Recibes el resultado de la consulta de un NIT en la base
interna de la entidad y saludas al cliente según corresponda.
Reglas:
- Responde en español, conversacional, sin formato JSON.
- Para clientes existentes: reconoce su historia, menciona sus productos actuales y usa el perfil
  amigable que se te entrega; NUNCA cites scores numéricos ni clasificaciones técnicas.
- Para empresas nuevas: da una bienvenida cálida y presenta los productos disponibles.
- Si ya conoces el tipo y monto del crédito solicitado, NO vuelvas a preguntarlos; pide los
  estados financieros para continuar la evaluación.",
};

const FINANCIAL: AgentProfile = AgentProfile {
    kind: AgentKind::Financial,
    description: "Computes financial ratios from extracted statements",
    system_prompt: "\
Eres el agente FINANCIERO. Recibes datos extraídos de estados financieros (texto y tablas) y
calculas los ratios del último año disponible:
- debt_equity = Total Pasivo / Patrimonio
- current_ratio = Activo Corriente / Pasivo Corriente
- ebitda_margin = (Utilidad Operación / Ingresos) * 100
- interest_coverage = Utilidad Operación / Gastos Financieros
- roa = (Utilidad Neta / Total Activo) * 100
- revenue_growth = variación porcentual de ingresos contra el año anterior
Entrega SOLO un JSON limpio, sin markdown ni explicaciones:
{\"debt_equity\": ..., \"current_ratio\": ..., \"ebitda_margin\": ..., \"interest_coverage\": ..., \"roa\": ..., \"revenue_growth\": ...}",
};

const SCORING: AgentProfile = AgentProfile {
    kind: AgentKind::Scoring,
    description: "Contextual credit scoring over computed ratios",
    system_prompt: "\
Eres el agente SCORING. Evalúas crediticiamente a una empresa con análisis contextual, no con
fórmulas rígidas: liquidez, apalancamiento, rentabilidad, crecimiento y sector.
Escala: 750+ excelente, 650-749 bueno, 550-649 aceptable, 400-549 débil, <400 crítico.
El monto recomendado debe ser REALISTA frente a la capacidad de pago; nunca cifras fantasiosas.
Entrega SOLO un JSON limpio:
{\"score\": <0-1000>, \"decision\": \"APROBADO|CONDICIONAL|RECHAZADO\",
 \"recommended_amount_cop\": <pesos>, \"risk_grade\": \"A1|A2|B1|B2|C1|C2|D\",
 \"key_factors\": [\"...\"]}",
};

const BUREAU: AgentProfile = AgentProfile {
    kind: AgentKind::Bureau,
    description: "Interprets risk-central reports",
    system_prompt: "\
Eres el agente de BURÓ. Analizas un reporte de centrales de riesgo colombianas: score externo,
comportamiento de pago, deudas por entidad, reportes negativos y procesos legales.
Sé riguroso pero justo; la ausencia de historial no es negativa, solo limita la evaluación.
Entrega SOLO un JSON limpio:
{\"bureau_score\": <score o null>, \"score_interpretation\": \"...\",
 \"overall_behavior\": \"...\",
 \"recommendation\": \"FAVORABLE|FAVORABLE CON OBSERVACIONES|OBSERVAR|ANALIZAR|DESFAVORABLE|RECHAZAR\",
 \"alerts\": [\"...\"], \"strengths\": [\"...\"]}",
};

const OFFER: AgentProfile = AgentProfile {
    kind: AgentKind::Offer,
    description: "Words pre-computed offer terms for pre-approved clients",
    system_prompt: "\
Eres el agente OFERTADOR. Recibes los parámetros YA CALCULADOS de una oferta crediticia
pre-aprobada y los presentas de forma atractiva.
Reglas:
- Responde en español con una tabla clara de condiciones.
- NUNCA cambies montos, tasas, plazos ni garantías: preséntalos tal como se te entregan.
- Personaliza según el perfil (cliente existente, sector, beneficios aplicables).
- Cierra SIEMPRE preguntando si desea continuar: responder SÍ o NO.",
};

const CONVERSATIONAL: AgentProfile = AgentProfile {
    kind: AgentKind::Conversational,
    description: "General credit-advisor chat",
    system_prompt: "\
Eres el asistente conversacional de CreditBot, un asesor crediticio experto de una entidad
financiera colombiana.
Reglas:
- Responde en español, natural y conversacional.
- Si el contexto ya incluye tipo de crédito y monto solicitados, NO vuelvas a preguntarlos.
- Orienta siempre al siguiente paso del proceso (NIT para verificación, estados financieros
  para evaluación).
- No inventes condiciones ni tasas; eso lo hace el proceso de oferta.",
};

/// Registry of agent profiles, keyed by kind.
pub struct AgentRegistry {
    profiles: HashMap<AgentKind, AgentProfile>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            profiles: HashMap::new(),
        }
    }

    pub fn register(&mut self, profile: AgentProfile) {
        self.profiles.insert(profile.kind, profile);
    }

    pub fn get(&self, kind: AgentKind) -> Option<&AgentProfile> {
        self.profiles.get(&kind)
    }

    /// System prompt for an agent. Unregistered kinds yield an empty
    /// prompt rather than an error.
    pub fn system_prompt(&self, kind: AgentKind) -> &'static str {
        self.profiles
            .get(&kind)
            .map(|p| p.system_prompt)
            .unwrap_or_default()
    }

    pub fn list(&self) -> Vec<AgentKind> {
        self.profiles.keys().copied().collect()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        create_default_registry()
    }
}

/// Registry with all seven specialist agents.
pub fn create_default_registry() -> AgentRegistry {
    let mut registry = AgentRegistry::new();
    registry.register(ORCHESTRATOR);
    registry.register(VERIFIER);
    registry.register(FINANCIAL);
    registry.register(SCORING);
    registry.register(BUREAU);
    registry.register(OFFER);
    registry.register(CONVERSATIONAL);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_has_all_agents() {
        let registry = create_default_registry();
        for kind in [
            AgentKind::Orchestrator,
            AgentKind::Verifier,
            AgentKind::Financial,
            AgentKind::Scoring,
            AgentKind::Bureau,
            AgentKind::Offer,
            AgentKind::Conversational,
        ] {
            assert!(registry.get(kind).is_some(), "missing agent {:?}", kind);
            assert!(!registry.system_prompt(kind).is_empty());
        }
        assert_eq!(registry.list().len(), 7);
    }

    #[test]
    fn test_json_agents_request_clean_json() {
        let registry = create_default_registry();
        for kind in [AgentKind::Financial, AgentKind::Scoring, AgentKind::Bureau] {
            assert!(registry.system_prompt(kind).contains("JSON limpio"));
        }
    }
}
