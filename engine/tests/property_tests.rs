use concierge_engine::config::Config;
use concierge_engine::memory::ConversationMemory;
use proptest::prelude::*;
use sdk::types::{ConversationEntry, EntryCategory};

fn category(index: u8) -> EntryCategory {
    match index % 3 {
        0 => EntryCategory::IntentClassification,
        1 => EntryCategory::ApiCall,
        _ => EntryCategory::DesignCall,
    }
}

// FIFO law: after N appends only the newest min(N, capacity) entries remain,
// in insertion order.
proptest! {
    #[test]
    fn test_memory_fifo_law(
        capacity in 1usize..=20,
        categories in prop::collection::vec(0u8..3, 0..=1000),
    ) {
        let memory = ConversationMemory::new(capacity);
        for (i, c) in categories.iter().enumerate() {
            memory.append(ConversationEntry::new(category(*c), i.to_string(), "out"));
        }

        let n = categories.len();
        let snapshot = memory.snapshot();
        prop_assert_eq!(snapshot.count, n.min(capacity));
        prop_assert_eq!(
            snapshot.intent_classifications.len()
                + snapshot.api_calls.len()
                + snapshot.design_calls.len(),
            snapshot.count
        );

        let kept: Vec<usize> = memory
            .entries()
            .iter()
            .map(|e| e.input_summary.parse().unwrap())
            .collect();
        let first_kept = n.saturating_sub(capacity);
        let expected: Vec<usize> = (first_kept..n).collect();
        prop_assert_eq!(kept, expected);
    }

    #[test]
    fn test_memory_clear_empties(
        capacity in 1usize..=10,
        appends in 0usize..=30,
    ) {
        let memory = ConversationMemory::new(capacity);
        for i in 0..appends {
            memory.append(ConversationEntry::new(EntryCategory::ApiCall, i.to_string(), "out"));
        }
        memory.clear();

        let snapshot = memory.snapshot();
        prop_assert_eq!(snapshot.count, 0);
        prop_assert_eq!(snapshot.capacity, capacity);
        prop_assert!(memory.is_empty());
    }

    #[test]
    fn test_config_round_trip(
        log_level in "error|warn|info|debug|trace",
        model in "[a-z0-9-]{3,20}",
        temperature in 0.0..=2.0f64,
        max_tokens in 1u32..=4096,
        capacity in 1usize..=100,
        data_timeout in 1u64..=120,
        port in 1024u16..=65535,
    ) {
        let mut config = Config::default();
        config.core.log_level = log_level.clone();
        config.llm.model = model.clone();
        config.llm.temperature = temperature;
        config.llm.max_tokens = max_tokens;
        config.memory.capacity = capacity;
        config.data_api.url = "http://data.local/api".to_string();
        config.data_api.timeout_secs = data_timeout;
        config.server.bind = format!("127.0.0.1:{}", port);

        let toml_string = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_string).unwrap();

        prop_assert_eq!(&parsed.core.log_level, &log_level);
        prop_assert_eq!(&parsed.llm.model, &model);
        prop_assert_eq!(parsed.llm.temperature, temperature);
        prop_assert_eq!(parsed.llm.max_tokens, max_tokens);
        prop_assert_eq!(parsed.memory.capacity, capacity);
        prop_assert_eq!(parsed.data_api.url.as_str(), "http://data.local/api");
        prop_assert_eq!(parsed.data_api.timeout_secs, data_timeout);
        prop_assert_eq!(&parsed.server.bind, &format!("127.0.0.1:{}", port));
        prop_assert!(parsed.validate().is_ok());
    }
}
