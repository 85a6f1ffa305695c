use super::Config;

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("MANAS_LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Ok(v) = std::env::var("MANAS_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("MANAS_LLM_EMBEDDING_MODEL") {
            self.llm.embedding_model = v;
        }
        if let Ok(v) = std::env::var("MANAS_TIMEOUT_LLM")
            && let Ok(secs) = v.parse::<u64>()
        {
            self.timeouts.llm_seconds = secs;
        }
        if let Ok(v) = std::env::var("MANAS_TIMEOUT_EMBEDDING")
            && let Ok(secs) = v.parse::<u64>()
        {
            self.timeouts.embedding_seconds = secs;
        }
        if let Ok(v) = std::env::var("MANAS_DATA_DIR") {
            self.index.data_dir = v.into();
        }
        if let Ok(v) = std::env::var("MANAS_STORAGE_DIR") {
            self.index.storage_dir = v.into();
        }
        if let Ok(v) = std::env::var("MANAS_RETRIEVAL_TOP_K")
            && let Ok(k) = v.parse::<usize>()
        {
            self.retrieval.top_k = k;
        }
        if let Ok(v) = std::env::var("MANAS_PERSONA") {
            self.persona.name = v;
        }
        if let Ok(v) = std::env::var("MANAS_GATEWAY_BIND") {
            self.gateway.bind = v;
        }
        if let Ok(v) = std::env::var("MANAS_GATEWAY_PORT") {
            if let Ok(port) = v.parse::<u16>() {
                self.gateway.port = port;
            } else {
                tracing::warn!("ignoring invalid MANAS_GATEWAY_PORT value: {v}");
            }
        }
    }
}
