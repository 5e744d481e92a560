//! Example: Browse a few live pages and check the rendered markdown
//!
//! Run with: cargo run -p browsekit --example browse_urls
//!
//! Uses a throwaway in-memory cache, so every page is fetched once and the
//! second pass is served from the cache.

use browsekit::{BrowseRequest, Browser, MemoryStore};

/// Page to browse and what its markdown should contain
struct Case {
    request: fn() -> BrowseRequest,
    description: &'static str,
    expect_contains: &'static str,
}

const CASES: &[Case] = &[
    Case {
        request: || BrowseRequest::new("https://example.com"),
        description: "Simple HTML page",
        expect_contains: "Example Domain",
    },
    Case {
        request: || BrowseRequest::new("https://httpbin.org/html").content_priority("largest"),
        description: "Long text, largest block",
        expect_contains: "Herman Melville",
    },
    Case {
        request: || BrowseRequest::new("https://github.com/rust-lang/rust/blob/master/README.md"),
        description: "GitHub file (raw short-circuit)",
        expect_contains: "source: github_raw",
    },
    Case {
        request: || {
            BrowseRequest::new("https://doc.rust-lang.org/std/")
                .include_navigation(true)
                .grep("collections")
                .context_lines(1)
        },
        description: "Docs page with navigation, filtered",
        expect_contains: "filtered by: 'collections'",
    },
];

#[tokio::main]
async fn main() {
    let browser = match Browser::builder().store(MemoryStore::new()).build() {
        Ok(browser) => browser,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    println!("browsekit URL examples");
    println!("======================\n");

    let mut passed = 0;
    let mut failed = 0;

    for pass in ["fetch", "cached"] {
        for (i, case) in CASES.iter().enumerate() {
            let request = (case.request)();
            println!("{}. {} ({})", i + 1, case.description, pass);
            println!("   URL: {}", request.url);

            match browser.browse(&request).await {
                Ok(text) => {
                    let header = text.lines().next().unwrap_or_default();
                    println!("   {}", header);
                    let preview: String = text.chars().skip(header.len()).take(100).collect();
                    println!("   Preview: {}", preview.trim().replace('\n', " "));

                    if text.contains(case.expect_contains) {
                        println!("   PASS\n");
                        passed += 1;
                    } else {
                        println!("   FAIL: expected '{}'\n", case.expect_contains);
                        failed += 1;
                    }
                }
                Err(e) => {
                    println!("   Error: {}\n   FAIL\n", e);
                    failed += 1;
                }
            }
        }
    }

    match browser.cache_stats() {
        Ok(stats) => println!("{}\n", stats),
        Err(e) => println!("Stats unavailable: {}\n", e),
    }

    println!("======================");
    println!("Results: {} passed, {} failed", passed, failed);

    if failed > 0 {
        std::process::exit(1);
    }
}
