// src/services/chat_service.rs

use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use crate::{
    common::error::{AppError, ProviderError},
    db::AiConfigRepository,
    models::chat::{AiConfig, AiProvider, ChatMessage, ChatSnapshot},
    services::responder::Responder,
};

pub const FALLBACK_REPLY: &str = "Desculpe, não consegui obter uma resposta do assistente agora. \
Verifique a configuração da IA ou tente novamente mais tarde.";

#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    Replied(ChatMessage),
    // Nada foi registrado e o provedor não foi chamado.
    NotConfigured,
    // Já existe uma troca em andamento; a mensagem foi descartada.
    Busy,
}

#[derive(Debug, Default)]
struct ChatState {
    config: AiConfig,
    is_open: bool,
    is_loading: bool,
    messages: Vec<ChatMessage>,
}

fn lock_state(state: &Mutex<ChatState>) -> MutexGuard<'_, ChatState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// Fecha a troca: registra a resposta e volta para Idle.
fn finish_exchange(state: &Mutex<ChatState>, reply: ChatMessage) {
    let mut state = lock_state(state);
    state.messages.push(reply);
    state.is_loading = false;
}

// Vive dentro da task da troca. Se ela terminar sem resposta (pânico no
// responder, runtime encerrando), o drop registra o fallback e libera a vez,
// mesmo que ninguém mais esteja esperando o resultado.
struct ExchangeGuard {
    state: Arc<Mutex<ChatState>>,
    finished: bool,
}

impl ExchangeGuard {
    fn finish(mut self, reply: ChatMessage) {
        finish_exchange(&self.state, reply);
        self.finished = true;
    }
}

impl Drop for ExchangeGuard {
    fn drop(&mut self) {
        if !self.finished {
            finish_exchange(&self.state, ChatMessage::assistant(FALLBACK_REPLY));
        }
    }
}

/// Sessão do assistente de IA do dashboard.
///
/// Estados: não configurado → configurado/ocioso ⇄ configurado/aguardando
/// resposta. `is_loading` garante no máximo uma troca em andamento; o
/// painel aberto/fechado é independente disso.
#[derive(Clone)]
pub struct ChatService {
    state: Arc<Mutex<ChatState>>,
    responder: Arc<dyn Responder>,
    config_repo: AiConfigRepository,
    response_timeout: Duration,
}

impl ChatService {
    pub fn new(
        responder: Arc<dyn Responder>,
        config_repo: AiConfigRepository,
        response_timeout: Duration,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(ChatState::default())),
            responder,
            config_repo,
            response_timeout,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ChatState> {
        lock_state(&self.state)
    }

    /// Lê a configuração persistida (chamado uma vez na inicialização).
    pub async fn load_config(&self) -> Result<(), AppError> {
        let config = self.config_repo.load().await?;
        if config.is_configured() {
            tracing::info!("🤖 Assistente de IA configurado a partir de {}", self.config_repo.path().display());
        }
        self.lock().config = config;
        Ok(())
    }

    // Persiste primeiro: se o disco falhar, o estado em memória não muda.
    pub async fn configure(
        &self,
        provider: Option<AiProvider>,
        api_key: Option<String>,
    ) -> Result<ChatSnapshot, AppError> {
        let config = AiConfig {
            provider,
            api_key: api_key
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty()),
        };

        self.config_repo.save(&config).await?;

        tracing::info!(
            "🤖 Configuração da IA atualizada (provedor: {}, configurado: {})",
            config.provider.map(|p| p.display_name()).unwrap_or("nenhum"),
            config.is_configured()
        );

        self.lock().config = config;
        Ok(self.snapshot())
    }

    pub fn is_configured(&self) -> bool {
        self.lock().config.is_configured()
    }

    pub fn toggle_visibility(&self) -> bool {
        let mut state = self.lock();
        state.is_open = !state.is_open;
        state.is_open
    }

    pub fn clear_messages(&self) {
        self.lock().messages.clear();
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        let state = self.lock();
        ChatSnapshot {
            is_configured: state.config.is_configured(),
            provider: state.config.provider,
            is_open: state.is_open,
            is_loading: state.is_loading,
            messages: state.messages.clone(),
        }
    }

    pub async fn send_message(&self, text: &str) -> SendOutcome {
        // 1. Verifica e reserva a vez, tudo sob o mesmo lock.
        let (provider, api_key, history) = {
            let mut state = self.lock();

            let Some((provider, api_key)) = state.config.credentials() else {
                tracing::debug!("Mensagem ignorada: assistente não configurado");
                return SendOutcome::NotConfigured;
            };
            let api_key = api_key.to_string();

            if state.is_loading {
                tracing::debug!("Mensagem ignorada: já existe uma resposta em andamento");
                return SendOutcome::Busy;
            }

            state.messages.push(ChatMessage::user(text));
            state.is_loading = true;
            (provider, api_key, state.messages.clone())
        };

        // 2. A troca roda numa task própria: se quem chamou desistir (ex: cliente
        // HTTP desconectou), a resposta ainda é registrada e a sessão volta a Idle.
        let guard = ExchangeGuard {
            state: Arc::clone(&self.state),
            finished: false,
        };
        let responder = Arc::clone(&self.responder);
        let timeout = self.response_timeout;

        let exchange = tokio::spawn(async move {
            let result = tokio::time::timeout(timeout, responder.respond(provider, &api_key, &history))
                .await
                .unwrap_or(Err(ProviderError::Timeout));

            let reply = match result {
                Ok(content) => ChatMessage::assistant(content),
                Err(e) => {
                    tracing::warn!("⚠️ Provedor {} falhou: {}", provider.display_name(), e);
                    ChatMessage::assistant(FALLBACK_REPLY)
                }
            };

            guard.finish(reply.clone());
            reply
        });

        match exchange.await {
            Ok(reply) => SendOutcome::Replied(reply),
            Err(join_err) => {
                // O guard já registrou o fallback; aqui só resta devolvê-lo.
                let e = ProviderError::Unavailable(join_err.to_string());
                tracing::error!("🔥 Troca com o provedor {} abortada: {}", provider.display_name(), e);
                let reply = self
                    .lock()
                    .messages
                    .last()
                    .cloned()
                    .unwrap_or_else(|| ChatMessage::assistant(FALLBACK_REPLY));
                SendOutcome::Replied(reply)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chat::ChatRole;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::{tempdir, TempDir};
    use tokio::sync::Notify;

    // Responde com o texto recebido e conta quantas vezes foi chamado.
    #[derive(Default)]
    struct EchoResponder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Responder for EchoResponder {
        async fn respond(&self, _: AiProvider, _: &str, history: &[ChatMessage]) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let last = history.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(format!("eco: {}", last))
        }
    }

    // Só responde quando o teste liberar.
    #[derive(Default)]
    struct GatedResponder {
        release: Notify,
    }

    #[async_trait]
    impl Responder for GatedResponder {
        async fn respond(&self, _: AiProvider, _: &str, _: &[ChatMessage]) -> Result<String, ProviderError> {
            self.release.notified().await;
            Ok("liberado".into())
        }
    }

    struct FailingResponder;

    #[async_trait]
    impl Responder for FailingResponder {
        async fn respond(&self, _: AiProvider, _: &str, _: &[ChatMessage]) -> Result<String, ProviderError> {
            Err(ProviderError::Unavailable("quota excedida".into()))
        }
    }

    struct SlowResponder;

    #[async_trait]
    impl Responder for SlowResponder {
        async fn respond(&self, _: AiProvider, _: &str, _: &[ChatMessage]) -> Result<String, ProviderError> {
            tokio::time::sleep(Duration::from_secs(60 * 60)).await;
            Ok("tarde demais".into())
        }
    }

    struct PanickingResponder;

    #[async_trait]
    impl Responder for PanickingResponder {
        async fn respond(&self, _: AiProvider, _: &str, _: &[ChatMessage]) -> Result<String, ProviderError> {
            panic!("bug no provedor");
        }
    }

    // Espera ser liberado e então entra em pânico.
    #[derive(Default)]
    struct GatedPanickingResponder {
        release: Notify,
    }

    #[async_trait]
    impl Responder for GatedPanickingResponder {
        async fn respond(&self, _: AiProvider, _: &str, _: &[ChatMessage]) -> Result<String, ProviderError> {
            self.release.notified().await;
            panic!("bug no provedor depois da desconexão");
        }
    }

    fn service_with(responder: Arc<dyn Responder>) -> (ChatService, TempDir) {
        let dir = tempdir().unwrap();
        let repo = AiConfigRepository::new(dir.path().join("ai_config.json"));
        (ChatService::new(responder, repo, Duration::from_secs(30)), dir)
    }

    async fn configured(responder: Arc<dyn Responder>) -> (ChatService, TempDir) {
        let (service, dir) = service_with(responder);
        service
            .configure(Some(AiProvider::OpenAi), Some("sk-teste".into()))
            .await
            .unwrap();
        (service, dir)
    }

    async fn wait_until_loading(service: &ChatService) {
        while !service.snapshot().is_loading {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn unconfigured_session_ignores_messages() {
        let responder = Arc::new(EchoResponder::default());
        let (service, _dir) = service_with(responder.clone());

        assert!(!service.is_configured());
        assert_eq!(service.send_message("oi").await, SendOutcome::NotConfigured);
        assert!(service.snapshot().messages.is_empty());
        assert_eq!(responder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn exchange_appends_user_then_assistant() {
        let (service, _dir) = configured(Arc::new(EchoResponder::default())).await;

        let outcome = service.send_message("vendas de hoje").await;
        let SendOutcome::Replied(reply) = outcome else {
            panic!("esperava uma resposta, veio {:?}", outcome);
        };
        assert_eq!(reply.content, "eco: vendas de hoje");

        let snapshot = service.snapshot();
        assert!(!snapshot.is_loading);
        assert_eq!(snapshot.messages.len(), 2);
        assert_eq!(snapshot.messages[0].role, ChatRole::User);
        assert_eq!(snapshot.messages[1].role, ChatRole::Assistant);
    }

    #[tokio::test]
    async fn second_message_is_dropped_while_awaiting_response() {
        let responder = Arc::new(GatedResponder::default());
        let (service, _dir) = configured(responder.clone()).await;

        let first = tokio::spawn({
            let service = service.clone();
            async move { service.send_message("a").await }
        });
        wait_until_loading(&service).await;

        assert_eq!(service.send_message("b").await, SendOutcome::Busy);
        let messages = service.snapshot().messages;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "a");

        responder.release.notify_one();
        assert!(matches!(first.await.unwrap(), SendOutcome::Replied(_)));

        let snapshot = service.snapshot();
        assert!(!snapshot.is_loading);
        assert_eq!(snapshot.messages.len(), 2);
        assert_eq!(snapshot.messages[1].content, "liberado");
    }

    #[tokio::test]
    async fn provider_failure_becomes_fallback_and_session_recovers() {
        let (service, _dir) = configured(Arc::new(FailingResponder)).await;

        let outcome = service.send_message("a").await;
        assert_eq!(
            outcome,
            SendOutcome::Replied(service.snapshot().messages[1].clone())
        );

        let snapshot = service.snapshot();
        let assistant: Vec<_> = snapshot.messages.iter().filter(|m| m.role == ChatRole::Assistant).collect();
        assert_eq!(assistant.len(), 1);
        assert_eq!(assistant[0].content, FALLBACK_REPLY);
        assert!(!snapshot.is_loading);

        // Volta a aceitar mensagens.
        assert!(matches!(service.send_message("b").await, SendOutcome::Replied(_)));
        assert_eq!(service.snapshot().messages.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_provider_hits_the_timeout() {
        let (service, _dir) = configured(Arc::new(SlowResponder)).await;

        let SendOutcome::Replied(reply) = service.send_message("a").await else {
            panic!("esperava a mensagem de fallback");
        };
        assert_eq!(reply.content, FALLBACK_REPLY);
        assert!(!service.snapshot().is_loading);
    }

    #[tokio::test]
    async fn panicking_provider_still_releases_the_session() {
        let (service, _dir) = configured(Arc::new(PanickingResponder)).await;

        let SendOutcome::Replied(reply) = service.send_message("a").await else {
            panic!("esperava a mensagem de fallback");
        };
        assert_eq!(reply.content, FALLBACK_REPLY);

        let snapshot = service.snapshot();
        assert!(!snapshot.is_loading);
        assert_eq!(snapshot.messages.len(), 2);
        assert_eq!(snapshot.messages[1], reply);
    }

    #[tokio::test]
    async fn panic_after_caller_left_still_releases_the_session() {
        let responder = Arc::new(GatedPanickingResponder::default());
        let (service, _dir) = configured(responder.clone()).await;

        let caller = tokio::spawn({
            let service = service.clone();
            async move { service.send_message("a").await }
        });
        wait_until_loading(&service).await;

        caller.abort();
        responder.release.notify_one();

        while service.snapshot().is_loading {
            tokio::task::yield_now().await;
        }

        let messages = service.snapshot().messages;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].content, FALLBACK_REPLY);

        // A sessão volta a aceitar mensagens (o responder agora entra em pânico de novo,
        // mas o resultado é o fallback e não `Busy`).
        responder.release.notify_one();
        assert!(matches!(service.send_message("b").await, SendOutcome::Replied(_)));
        assert!(!service.snapshot().is_loading);
    }

    #[tokio::test]
    async fn dropped_caller_does_not_leave_session_stuck() {
        let responder = Arc::new(GatedResponder::default());
        let (service, _dir) = configured(responder.clone()).await;

        let caller = tokio::spawn({
            let service = service.clone();
            async move { service.send_message("a").await }
        });
        wait_until_loading(&service).await;

        caller.abort();
        responder.release.notify_one();

        while service.snapshot().is_loading {
            tokio::task::yield_now().await;
        }
        assert_eq!(service.snapshot().messages.len(), 2);
    }

    #[tokio::test]
    async fn clear_messages_keeps_configuration() {
        let (service, _dir) = configured(Arc::new(EchoResponder::default())).await;
        service.send_message("a").await;

        service.clear_messages();

        let snapshot = service.snapshot();
        assert!(snapshot.messages.is_empty());
        assert!(snapshot.is_configured);
        assert_eq!(snapshot.provider, Some(AiProvider::OpenAi));
    }

    #[tokio::test]
    async fn toggle_visibility_flips_open_flag() {
        let (service, _dir) = service_with(Arc::new(EchoResponder::default()));

        assert!(!service.snapshot().is_open);
        assert!(service.toggle_visibility());
        assert!(!service.toggle_visibility());
    }

    #[tokio::test]
    async fn configuration_is_persisted_and_reloaded() {
        let (service, dir) = configured(Arc::new(EchoResponder::default())).await;
        assert!(service.is_configured());

        let repo = AiConfigRepository::new(dir.path().join("ai_config.json"));
        let restarted = ChatService::new(Arc::new(EchoResponder::default()), repo, Duration::from_secs(30));
        assert!(!restarted.is_configured());

        restarted.load_config().await.unwrap();
        assert!(restarted.is_configured());
    }

    #[tokio::test]
    async fn blank_key_leaves_session_unconfigured() {
        let (service, _dir) = configured(Arc::new(EchoResponder::default())).await;

        let snapshot = service.configure(Some(AiProvider::Gemini), Some("   ".into())).await.unwrap();
        assert!(!snapshot.is_configured);
        assert_eq!(service.send_message("a").await, SendOutcome::NotConfigured);
    }
}
