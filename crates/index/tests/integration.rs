//! Integration tests for index crate

#[cfg(test)]
mod tests {
    use firstrun_index::*;
    use firstrun_types::{CategoryFilter, CategoryNames};
    use proptest::prelude::*;
    use serde_json::json;
    use std::path::Path;
    use tempfile::{tempdir, TempDir};

    fn write_repo(manifest: &serde_json::Value) -> TempDir {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("index-v1.json"),
            serde_json::to_vec_pretty(manifest).unwrap(),
        )
        .unwrap();
        dir
    }

    fn sample_manifest() -> serde_json::Value {
        json!({
            "repo": { "name": "bundled" },
            "apps": [
                {
                    "packageName": "org.example.browser",
                    "categories": ["Default", "Internet"],
                    "name": "Browser",
                    "icon": "browser.png",
                    "summary": "Browse",
                    "localized": {
                        "en-US": { "name": "Browser", "description": "Fast\nPrivate" },
                        "de": { "name": "Webbrowser", "summary": "Surfen" }
                    }
                },
                {
                    "packageName": "org.example.nlp",
                    "categories": ["DefaultBackend"],
                    "name": "Location Provider"
                },
                {
                    "packageName": "org.example.notes",
                    "categories": ["Writing"],
                    "description": "Line one\nLine two"
                },
                { "name": "Broken, no package name", "categories": ["Default"] },
                {
                    "packageName": "org.example.orphan",
                    "categories": ["Default"]
                }
            ],
            "packages": {
                "org.example.browser": [
                    { "apkName": "browser_120.apk" },
                    { "apkName": "browser_110.apk" }
                ],
                "org.example.nlp": [{ "apkName": "nlp_3.apk" }],
                "org.example.notes": [{ "apkName": "notes_7.apk" }]
            }
        })
    }

    #[tokio::test]
    async fn test_default_category_mode() {
        let repo = write_repo(&sample_manifest());
        std::fs::create_dir_all(repo.path().join("icons-640")).unwrap();
        std::fs::write(repo.path().join("icons-640/browser.png"), b"png").unwrap();

        let load = load_index(repo.path(), &CategoryFilter::default(), &IndexOptions::default())
            .await
            .unwrap();

        let ids: Vec<_> = load.apps.iter().map(|a| a.package_id.as_str()).collect();
        assert_eq!(ids, vec!["org.example.browser", "org.example.notes"]);
        assert_eq!(load.skipped.len(), 2, "nameless entry and orphan are skipped");

        let browser = &load.apps[0];
        assert!(browser.checked);
        assert_eq!(browser.archive_ref, "browser_120.apk");
        assert_eq!(
            browser.icon.as_deref(),
            Some(repo.path().join("icons-640/browser.png").as_path())
        );
        // No preferences: en-US is the first candidate
        assert_eq!(browser.display_name.as_deref(), Some("Browser"));
        assert_eq!(browser.description.as_deref(), Some("Fast<br>Private"));
        assert_eq!(browser.summary.as_deref(), Some("Browse"));

        let notes = &load.apps[1];
        assert!(!notes.checked);
        assert_eq!(notes.display_name, None);
        assert_eq!(notes.icon, None);
        assert_eq!(notes.description.as_deref(), Some("Line one<br>Line two"));
    }

    #[tokio::test]
    async fn test_localized_preferences() {
        let repo = write_repo(&sample_manifest());
        let options = IndexOptions::default().with_preferences(vec!["de-AT".to_string()]);

        let load = load_index(repo.path(), &CategoryFilter::default(), &options)
            .await
            .unwrap();
        let browser = &load.apps[0];
        assert_eq!(browser.display_name.as_deref(), Some("Webbrowser"));
        assert_eq!(browser.summary.as_deref(), Some("Surfen"));
        // German block has no description, so the en-US one is used
        assert_eq!(browser.description.as_deref(), Some("Fast<br>Private"));
    }

    #[tokio::test]
    async fn test_specific_category_mode() {
        let repo = write_repo(&sample_manifest());
        let filter = CategoryFilter::for_category("DefaultBackend", &CategoryNames::default());

        let load = load_index(repo.path(), &filter, &IndexOptions::default())
            .await
            .unwrap();
        assert_eq!(load.apps.len(), 1);
        assert_eq!(load.apps[0].package_id, "org.example.nlp");
        assert!(load.apps[0].checked);
    }

    #[tokio::test]
    async fn test_verify_index_readable() {
        let missing = tempdir().unwrap();
        let err = verify_index_readable(missing.path(), &IndexOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            firstrun_errors::Error::Index(firstrun_errors::IndexError::ManifestNotFound { .. })
        ));

        std::fs::write(missing.path().join("index-v1.json"), "{ not json").unwrap();
        let err = verify_index_readable(missing.path(), &IndexOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            firstrun_errors::Error::Index(firstrun_errors::IndexError::ManifestParse { .. })
        ));

        let repo = write_repo(&sample_manifest());
        verify_index_readable(repo.path(), &IndexOptions::default())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_layout_detection() {
        let repo = write_repo(&sample_manifest());
        let layout = RepositoryLayout::detect(repo.path(), &IndexOptions::default())
            .await
            .unwrap();
        assert_eq!(layout.name(), "manifest");

        let flat = tempdir().unwrap();
        let layout = RepositoryLayout::detect(flat.path(), &IndexOptions::default())
            .await
            .unwrap();
        assert_eq!(layout, RepositoryLayout::Flat);

        let err = RepositoryLayout::detect(Path::new("/nonexistent/repo"), &IndexOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            firstrun_errors::Error::Index(firstrun_errors::IndexError::RepositoryUnavailable { .. })
        ));
    }

    async fn stage_archive(dir: &Path, file: &str, manifest: &str) {
        let src = dir.join(format!("{file}.src"));
        tokio::fs::create_dir_all(&src).await.unwrap();
        tokio::fs::write(src.join("manifest.toml"), manifest).await.unwrap();
        tokio::fs::write(src.join("classes.dex"), b"dex").await.unwrap();
        firstrun_archive::create_archive(&src, &dir.join(file)).await.unwrap();
        tokio::fs::remove_dir_all(&src).await.unwrap();
    }

    #[tokio::test]
    async fn test_flat_layout() {
        let dir = tempdir().unwrap();
        stage_archive(
            dir.path(),
            "b.apk",
            "[package]\nid = \"org.b\"\nlabel = \"Bee\"\ndescription = \"x\\ny\"\n",
        )
        .await;
        stage_archive(dir.path(), "a.apk", "[package]\nid = \"org.a\"\n").await;
        std::fs::write(dir.path().join("c.apk"), b"garbage").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let load = load_repository(dir.path(), &CategoryFilter::default(), &IndexOptions::default())
            .await
            .unwrap();
        assert_eq!(load.layout, RepositoryLayout::Flat);
        let ids: Vec<_> = load.apps.iter().map(|a| a.package_id.as_str()).collect();
        assert_eq!(ids, vec!["org.a", "org.b"]);
        assert!(load.apps.iter().all(|a| a.checked));
        assert!(Path::new(&load.apps[0].archive_ref).is_absolute());
        assert_eq!(load.apps[1].display_name.as_deref(), Some("Bee"));
        assert_eq!(load.apps[1].description.as_deref(), Some("x<br>y"));
        assert_eq!(load.skipped.len(), 1);
    }

    #[tokio::test]
    async fn test_flat_layout_applies_category_filter() {
        let dir = tempdir().unwrap();
        stage_archive(
            dir.path(),
            "backend.apk",
            "[package]\nid = \"org.backend\"\ncategories = [\"DefaultBackend\"]\n",
        )
        .await;
        stage_archive(
            dir.path(),
            "game.apk",
            "[package]\nid = \"org.game\"\ncategories = [\"Games\"]\n",
        )
        .await;
        stage_archive(
            dir.path(),
            "maps.apk",
            "[package]\nid = \"org.maps\"\ncategories = [\"Default\"]\n",
        )
        .await;
        stage_archive(dir.path(), "plain.apk", "[package]\nid = \"org.plain\"\n").await;

        let options = IndexOptions::default();
        let load = load_repository(dir.path(), &CategoryFilter::default(), &options)
            .await
            .unwrap();
        let listed: Vec<_> = load
            .apps
            .iter()
            .map(|a| (a.package_id.as_str(), a.checked))
            .collect();
        assert_eq!(
            listed,
            vec![("org.game", false), ("org.maps", true), ("org.plain", true)]
        );

        let filter = CategoryFilter::for_category("Games", &CategoryNames::default());
        let load = load_repository(dir.path(), &filter, &options).await.unwrap();
        let ids: Vec<_> = load.apps.iter().map(|a| a.package_id.as_str()).collect();
        assert_eq!(ids, vec!["org.game"]);
        assert!(load.skipped.is_empty());
    }

    fn category_strategy() -> impl Strategy<Value = Vec<String>> {
        proptest::collection::vec(
            prop_oneof![
                Just("Default".to_string()),
                Just("DefaultBackend".to_string()),
                "[A-Z][a-z]{1,6}",
            ],
            0..4,
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn default_mode_never_returns_bare_providers(apps in proptest::collection::vec(category_strategy(), 0..8)) {
            let entries: Vec<_> = apps
                .iter()
                .enumerate()
                .map(|(i, cats)| json!({ "packageName": format!("p{i}"), "categories": cats }))
                .collect();
            let packages: serde_json::Map<_, _> = (0..apps.len())
                .map(|i| (format!("p{i}"), json!([{ "apkName": format!("p{i}.apk") }])))
                .collect();
            let repo = write_repo(&json!({ "apps": entries, "packages": packages }));

            let runtime = tokio::runtime::Runtime::new().unwrap();
            let load = runtime
                .block_on(load_index(repo.path(), &CategoryFilter::default(), &IndexOptions::default()))
                .unwrap();

            for app in &load.apps {
                prop_assert!(!(app.has_category("DefaultBackend") && !app.has_category("Default")));
                prop_assert_eq!(app.checked, app.has_category("Default"));
            }
        }

        #[test]
        fn en_us_listed_once_before_other_english(
            extra in proptest::collection::btree_set("(de|fr|en|es)(-[A-Z]{2})?", 0..6),
            prefs in proptest::collection::vec("(de|fr|es|it)(-[A-Z]{2})?", 0..3),
        ) {
            let mut available: Vec<String> = extra.into_iter().collect();
            available.push("en-US".to_string());
            available.sort();
            available.dedup();

            let candidates = LocaleCandidates::resolve(available.iter().map(String::as_str), &prefs);
            let tags = candidates.as_slice();

            prop_assert_eq!(tags.iter().filter(|t| *t == "en-US").count(), 1);
            let en_us = tags.iter().position(|t| t == "en-US").unwrap();
            for (i, tag) in tags.iter().enumerate() {
                if tag.starts_with("en") && tag != "en-US" {
                    prop_assert!(en_us < i);
                }
            }
        }
    }
}
