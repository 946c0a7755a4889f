// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 配置设置测试模块
///
/// 测试配置文件加载和默认值覆盖

#[cfg(test)]
mod tests {
    use sitescan::config::settings::Settings;
    use std::time::Duration;

    #[test]
    fn test_config_loading_from_default_toml() {
        let settings = Settings::new().expect("configuration should load");

        assert!(!settings.server.host.is_empty());
        assert!(settings.server.port > 0);
        assert!(settings.crawler.probe_concurrency > 0);
        assert!(settings.crawler.max_global_probes >= settings.crawler.probe_concurrency);
        assert!(settings.realtime.subscriber_queue_capacity > 0);
    }

    #[test]
    fn test_file_source_overrides_defaults() {
        let settings: Settings = Settings::builder()
            .unwrap()
            .add_source(::config::File::from_str(
                r#"
                [crawler]
                probe_timeout_secs = 3
                crawl_timeout_secs = 60

                [auth]
                api_key = "secret"
                "#,
                ::config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.crawler.probe_timeout(), Duration::from_secs(3));
        assert_eq!(settings.crawler.crawl_timeout(), Duration::from_secs(60));
        assert_eq!(settings.crawler.request_timeout(), Duration::from_secs(30));
        assert_eq!(settings.auth.api_key, "secret");
        assert_eq!(settings.database.max_connections, Some(20));
    }
}
