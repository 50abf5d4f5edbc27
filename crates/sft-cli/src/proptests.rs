//! Property-based tests for sft-cli

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::config::{CliOverrides, Config};
    use crate::output::{JsonResponse, OutputFormat};

    fn output_format() -> impl Strategy<Value = OutputFormat> {
        prop_oneof![
            Just(OutputFormat::Table),
            Just(OutputFormat::Json),
            Just(OutputFormat::Quiet),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        // Display output always parses back, in any letter case.
        #[test]
        fn test_output_format_parses_display(format in output_format(), upper in any::<bool>()) {
            let text = format.to_string();
            let text = if upper { text.to_uppercase() } else { text };
            prop_assert_eq!(text.parse::<OutputFormat>().unwrap(), format);
        }

        #[test]
        fn test_unknown_output_format_rejected(s in "[a-z]{1,10}") {
            prop_assume!(!["table", "json", "quiet"].contains(&s.as_str()));
            prop_assert!(s.parse::<OutputFormat>().is_err());
        }

        // Overrides never produce a config that fails validation.
        #[test]
        fn test_overrides_keep_config_valid(
            format in proptest::option::of(output_format()),
            verbose in proptest::option::of(any::<bool>()),
            debug in proptest::option::of(any::<bool>()),
            relay in proptest::option::of("[a-z]{1,12}:[0-9]{1,5}"),
        ) {
            let overrides = CliOverrides {
                output_format: format,
                verbose,
                debug,
                relay_addr: relay.clone(),
            };
            let config = Config::default().with_overrides(&overrides);
            prop_assert!(config.validate().is_ok());
            if let Some(format) = format {
                prop_assert_eq!(config.output_format(), format);
            }
            if let Some(relay) = relay {
                prop_assert_eq!(config.transport.relay_addr, relay);
            }
            if debug == Some(true) {
                prop_assert_eq!(config.logging.level.as_str(), "debug");
            }
        }

        // Whatever passes validation survives a TOML round trip unchanged.
        #[test]
        fn test_config_toml_round_trip(
            attempts in 1u32..20,
            delay in 0u64..10_000,
            max_file_size in 1u64..(1u64 << 32),
            format in output_format(),
        ) {
            let mut config = Config::default();
            config.transport.connect_attempts = attempts;
            config.transport.retry_delay_ms = delay;
            config.transfer.max_file_size = max_file_size;
            config.output.format = format.to_string();

            let text = toml::to_string_pretty(&config).unwrap();
            let parsed = Config::from_toml(&text).unwrap();
            prop_assert_eq!(parsed, config);
        }

        #[test]
        fn test_json_response_always_has_timestamp(data in ".*", command in "[a-z]{1,10}") {
            let response = JsonResponse::success_with_command(&data, &command);
            let value = serde_json::to_value(&response).unwrap();
            prop_assert_eq!(&value["success"], &serde_json::json!(true));
            prop_assert_eq!(&value["data"], &serde_json::json!(data));
            prop_assert!(value["timestamp"].as_str().map(|t| !t.is_empty()).unwrap_or(false));
        }
    }
}
