use doc_sync_core::config::{
    LinkConditionConfig, LinkRewriteConfig, LinkRuleConfig, TransformConfig,
};
use doc_sync_core::error::ConfigError;
use doc_sync_core::transform::{
    default_labels, merge_tab_groups, rewrite_filename_attributes, strip_pages_only,
    MarkdownTransformer,
};

const SWITCHER_PAIR: &str = r#"---
title: Pages
---

```tsx switcher filename="app/page.tsx"
export default function Page() {}
```

```jsx switcher filename="app/page.js"
export default function Page() {}
```
"#;

#[test]
fn test_filename_attribute_rewrite_is_idempotent() {
    let doc = "```js filename=\"next.config.js\" {2}\nmodule.exports = {}\n```\n";
    let once = rewrite_filename_attributes(doc);
    assert_eq!(
        once,
        "```js title=\"next.config.js\" {2}\nmodule.exports = {}\n```\n"
    );
    assert_eq!(rewrite_filename_attributes(&once), once);
}

#[test]
fn test_consecutive_switcher_blocks_merge_into_one_group() {
    let out = MarkdownTransformer::default().transform(SWITCHER_PAIR);

    assert_eq!(out.matches("<Tabs groupId=\"language\" queryString>").count(), 1);
    assert_eq!(out.matches("<TabItem ").count(), 2);
    let ts = out
        .find("<TabItem value=\"tsx\" label=\"TypeScript\">")
        .expect("tsx tab");
    let js = out
        .find("<TabItem value=\"jsx\" label=\"JavaScript\">")
        .expect("jsx tab");
    assert!(ts < js, "tabs keep source order");
    assert!(out.contains("```tsx title=\"app/page.tsx\"\nexport default function Page() {}\n```"));
    assert!(out.starts_with(
        "---\ntitle: Pages\n---\n\nimport Tabs from '@theme/Tabs'\nimport TabItem from '@theme/TabItem'\n\n"
    ));
    assert!(!out.contains("switcher"));
}

#[test]
fn test_prose_between_switcher_blocks_prevents_merging() {
    let doc = "```tsx switcher title=\"app/page.tsx\"\na\n```\n\nSome prose in between.\n\n```jsx switcher title=\"app/page.js\"\nb\n```\n";
    let out = merge_tab_groups(doc, &default_labels());

    assert_eq!(out.matches("<Tabs groupId=\"language\" queryString>").count(), 2);
    assert_eq!(out.matches("<TabItem ").count(), 2);
    assert!(out.contains("</Tabs>\n\nSome prose in between.\n\n<Tabs"));
}

#[test]
fn test_blocks_without_switcher_or_title_are_left_alone() {
    let doc = "```tsx title=\"app/page.tsx\"\na\n```\n\n```jsx switcher\nb\n```\n";
    let out = merge_tab_groups(doc, &default_labels());
    assert_eq!(out, doc);
}

#[test]
fn test_heading_gets_anchor() {
    let out = MarkdownTransformer::default().transform("## Getting Started!\n\nText.\n");
    assert_eq!(out, "## Getting Started! {#getting-started}\n\nText.\n");
    assert_eq!(MarkdownTransformer::default().transform(&out), out);
}

#[test]
fn test_headings_and_links_inside_code_are_untouched() {
    let doc = "```bash\n# install\nopen [x](/docs/pages/a)\n```\n";
    assert_eq!(MarkdownTransformer::default().transform(doc), doc);
}

#[test]
fn test_pages_link_points_at_versioned_external_docs() {
    let config = TransformConfig {
        docs_version: "13".to_string(),
        ..TransformConfig::default()
    };
    let transformer = MarkdownTransformer::new(&config).expect("valid config");
    let out = transformer.transform("See [a](/docs/pages/foo) and ![img](/docs/pages/x.png).\n");
    assert_eq!(
        out,
        "See [a](https://nextjs.org/docs/13/pages/foo) and ![img](/docs/pages/x.png).\n"
    );
}

#[test]
fn test_configured_link_rules_replace_the_defaults() {
    let config = TransformConfig {
        link_rules: Some(vec![
            LinkRuleConfig {
                when: LinkConditionConfig::Pattern(r"^/docs/\d+/".to_string()),
                rewrite: LinkRewriteConfig::Resolve {
                    base: "https://archive.example.com".to_string(),
                },
            },
            LinkRuleConfig {
                when: LinkConditionConfig::Exact("/home".to_string()),
                rewrite: LinkRewriteConfig::ReplacePrefix {
                    prefix: "/home".to_string(),
                    with: "/docs/{version}".to_string(),
                },
            },
        ]),
        ..TransformConfig::default()
    };
    let transformer = MarkdownTransformer::new(&config).expect("valid config");
    let out = transformer.transform("[a](/docs/12/x) [b](/home) [c](/docs/pages/y)\n");
    assert_eq!(
        out,
        "[a](https://archive.example.com/docs/12/x) [b](/docs/14) [c](/docs/pages/y)\n"
    );
}

#[test]
fn test_invalid_link_pattern_is_a_config_error() {
    let config = TransformConfig {
        link_rules: Some(vec![LinkRuleConfig {
            when: LinkConditionConfig::Pattern("(".to_string()),
            rewrite: LinkRewriteConfig::Resolve {
                base: "https://example.com".to_string(),
            },
        }]),
        ..TransformConfig::default()
    };
    assert!(matches!(
        MarkdownTransformer::new(&config),
        Err(ConfigError::LinkPattern { .. })
    ));
}

#[test]
fn test_pages_only_blocks_are_stripped() {
    let doc = "Intro\n<PagesOnly>\n\nPages content\n\n</PagesOnly>\nOutro\n";
    assert_eq!(strip_pages_only(doc), "Intro\nOutro\n");
}

#[test]
fn test_custom_switcher_labels_override_defaults() {
    let mut config = TransformConfig::default();
    config
        .switcher_labels
        .insert("bash".to_string(), "Shell".to_string());
    let transformer = MarkdownTransformer::new(&config).expect("valid config");
    let out = transformer.transform("```bash switcher title=\"install\"\nnpm i next\n```\n");
    assert!(out.contains("<TabItem value=\"bash\" label=\"Shell\">"));
}

#[test]
fn test_heading_anchor_ignores_rewritten_link_target() {
    let out = MarkdownTransformer::default().transform("## Using [Image](/docs/pages/api/image)\n");
    assert_eq!(
        out,
        "## Using [Image](https://nextjs.org/docs/14/pages/api/image) {#using-image}\n"
    );
}

#[test]
fn test_double_quoted_tab_imports_are_not_duplicated() {
    let doc = format!(
        "import Tabs from \"@theme/Tabs\"\nimport TabItem from \"@theme/TabItem\"\n\n{}",
        SWITCHER_PAIR.trim_start_matches("---\ntitle: Pages\n---\n\n")
    );
    let out = merge_tab_groups(&rewrite_filename_attributes(&doc), &default_labels());
    assert_eq!(out.matches("import Tabs ").count(), 1);
    assert_eq!(out.matches("import TabItem ").count(), 1);
    assert_eq!(out.matches("<Tabs ").count(), 1);
}

#[test]
fn test_inline_code_links_and_front_matter_survive() {
    let doc = "---\ntitle: Links\n# draft\n---\n\nWrite `[a](/docs/pages/x)` literally.\n[![badge](/img.png)](/docs/pages/x)\n";
    let out = MarkdownTransformer::default().transform(doc);
    assert_eq!(
        out,
        "---\ntitle: Links\n# draft\n---\n\nWrite `[a](/docs/pages/x)` literally.\n[![badge](/img.png)](https://nextjs.org/docs/14/pages/x)\n"
    );
}
