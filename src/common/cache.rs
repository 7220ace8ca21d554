// src/common/cache.rs

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};
use tokio::{task::JoinHandle, time::Instant};

// Uma entrada do cache. `expires_at == None` significa "nunca expira".
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Cache chave/valor em memória com expiração por entrada.
///
/// Não há limite de capacidade nem LRU: a única política de remoção é o TTL
/// (leitura preguiçosa em `get` + varredura periódica em `cleanup`).
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    default_ttl: Option<Duration>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(default_ttl: Option<Duration>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            default_ttl,
        }
    }

    // Um lock envenenado ainda tem um mapa válido; seguimos com ele.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // O TTL padrão é resolvido para um instante absoluto AGORA, não depois.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let expires_at = ttl.or(self.default_ttl).map(|ttl| Instant::now() + ttl);
        self.lock().insert(key.into(), CacheEntry { value, expires_at });
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.lock();
        let expired = entries.get(key)?.is_expired(Instant::now());

        if expired {
            entries.remove(key);
            return None;
        }

        entries.get(key).map(|entry| entry.value.clone())
    }

    // Ainda sem chamador fora dos testes.
    #[allow(dead_code)]
    pub fn delete(&self, key: &str) {
        self.lock().remove(key);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Remove todas as entradas expiradas e retorna quantas saíram.
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

// Varredura periódica: limita a memória quando algo é gravado e nunca mais lido.
pub fn spawn_cleanup_task<V>(cache: Arc<TtlCache<V>>, every: Duration) -> JoinHandle<()>
where
    V: Clone + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // O primeiro tick é imediato; não há nada para limpar ainda.
        interval.tick().await;

        loop {
            interval.tick().await;
            if cache.is_empty() {
                continue;
            }

            let removed = cache.cleanup();
            if removed > 0 {
                tracing::debug!("🧹 Cache: {} entradas expiradas removidas, {} restantes", removed, cache.len());
            }
        }
    })
}
