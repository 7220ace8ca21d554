// src/services/responder.rs

use std::time::Duration;

use async_trait::async_trait;

use crate::{
    common::error::ProviderError,
    models::chat::{AiProvider, ChatMessage, ChatRole},
};

/// Ida e volta até um provedor externo de IA.
///
/// O `ChatService` só conhece este trait; trocar a simulação por um cliente
/// HTTP de verdade não muda a máquina de estados do chat.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(
        &self,
        provider: AiProvider,
        api_key: &str,
        history: &[ChatMessage],
    ) -> Result<String, ProviderError>;
}

// Respostas prontas, escolhidas por palavra-chave na última mensagem do usuário.
// A primeira entrada que casar vence; a saudação fica por último.
const CANNED_REPLIES: &[(&[&str], &str)] = &[
    (
        &["ticket médio", "ticket medio", "média", "media", "average"],
        "O ticket médio está estável nas últimas semanas. Mesas com 4 ou mais pessoas puxam a média para cima, vale destacar combos para grupos.",
    ),
    (
        &["gorjeta", "tip"],
        "Cerca de 60% das comandas têm gorjeta, em geral entre 5% e 15% do total. Atendimento mais rápido costuma render gorjetas maiores.",
    ),
    (
        &["pagamento", "cartão", "cartao", "pix", "dinheiro", "payment"],
        "Cartão continua sendo a forma de pagamento dominante, seguido de transferência pelo celular. Dinheiro vem caindo mês a mês.",
    ),
    (
        &["desconto", "cupom", "voucher", "marketing", "discount"],
        "Cerca de 20% das comandas usam desconto. Acompanhe se as campanhas de marketing estão trazendo clientes novos ou só reduzindo a margem.",
    ),
    (
        &["pico", "horário", "horario", "movimento", "peak"],
        "O maior movimento acontece no jantar, entre 19h e 22h. Reforçar a equipe nesse horário reduz o tempo de mesa.",
    ),
    (
        &["venda", "faturamento", "receita", "sales", "revenue"],
        "As vendas dos últimos 30 dias estão concentradas nos fins de semana. Sexta e sábado somam quase metade do faturamento.",
    ),
    (
        &["olá", "ola", "oi", "bom dia", "boa tarde", "boa noite", "hello", "hi"],
        "Olá! Posso ajudar com vendas, ticket médio, gorjetas, formas de pagamento e horários de pico.",
    ),
];

const DEFAULT_REPLY: &str =
    "Ainda não tenho uma análise pronta para isso. Tente perguntar sobre vendas, ticket médio, gorjetas, pagamentos ou descontos.";

// Simulação de provedor: espera um pouco e devolve uma resposta pronta.
#[derive(Debug, Clone)]
pub struct CannedResponder {
    latency: Duration,
}

impl CannedResponder {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    fn key_looks_valid(provider: AiProvider, api_key: &str) -> bool {
        match provider {
            AiProvider::OpenAi => api_key.starts_with("sk-"),
            AiProvider::Gemini => api_key.starts_with("AIza"),
        }
    }

    fn pick_reply(question: &str) -> &'static str {
        let question = question.to_lowercase();
        let words: Vec<&str> = question
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        // Palavras curtas ("oi", "hi") só valem como palavra inteira.
        let mentions = |keyword: &str| {
            if keyword.contains(' ') || keyword.chars().count() > 3 {
                question.contains(keyword)
            } else {
                words.iter().any(|w| *w == keyword)
            }
        };

        CANNED_REPLIES
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|&k| mentions(k)))
            .map(|(_, reply)| *reply)
            .unwrap_or(DEFAULT_REPLY)
    }
}

#[async_trait]
impl Responder for CannedResponder {
    async fn respond(
        &self,
        provider: AiProvider,
        api_key: &str,
        history: &[ChatMessage],
    ) -> Result<String, ProviderError> {
        tokio::time::sleep(self.latency).await;

        if !Self::key_looks_valid(provider, api_key) {
            return Err(ProviderError::InvalidKey);
        }

        let question = history
            .iter()
            .rev()
            .find(|message| message.role == ChatRole::User)
            .map(|message| message.content.as_str())
            .unwrap_or_default();

        Ok(format!("[{}] {}", provider.display_name(), Self::pick_reply(question)))
    }
}
