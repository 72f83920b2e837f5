//! Scraper script templates written into the scripts mount.

use chrono::{DateTime, Local};

/// File name of the example script created by `sandbox example`.
pub const EXAMPLE_SCRIPT_NAME: &str = "example_scraper.py";

/// URL used by the basic template when none is given.
pub const DEFAULT_TEMPLATE_URL: &str = "https://example.com";

const URL_PLACEHOLDER: &str = "__URL__";
const CREATED_PLACEHOLDER: &str = "__CREATED__";

const EXAMPLE_SCRIPT: &str = r#"#!/usr/bin/env python3
"""
Example script for the Playwright sandbox.
"""

from playwright.sync_api import sync_playwright
import json
import time


def scrape_example():
    """Basic Playwright scraping example."""
    print("Starting Playwright example...")

    with sync_playwright() as p:
        browser = p.chromium.launch(headless=True)
        page = browser.new_page()

        print("Navigating to example.com...")
        page.goto("https://example.com")

        title = page.title()
        heading = page.query_selector("h1").inner_text()

        print(f"Title: {title}")
        print(f"Heading: {heading}")

        results = {
            "url": "https://example.com",
            "title": title,
            "heading": heading,
            "timestamp": time.time(),
        }

        with open("/app/persistent/example_results.json", "w") as f:
            json.dump(results, f, indent=2)

        print("Results saved to example_results.json")

        browser.close()


if __name__ == "__main__":
    scrape_example()
"#;

const BASIC_TEMPLATE: &str = r#"#!/usr/bin/env python3
"""
Generated scraping script.
Created: __CREATED__
"""

from playwright.sync_api import sync_playwright
import json
from datetime import datetime


def scrape_data():
    """Main scraping routine."""
    print("Starting Playwright scraper...")

    results = []

    with sync_playwright() as p:
        browser = p.chromium.launch(headless=True)
        page = browser.new_page()

        page.set_extra_http_headers({
            "User-Agent": "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
        })

        try:
            print("Navigating to: __URL__")
            page.goto("__URL__", wait_until="networkidle")
            page.wait_for_timeout(2000)

            title = page.title()
            print(f"Page title: {title}")

            # Replace with real extraction, for example:
            # for element in page.query_selector_all(".item"):
            #     results.append({"text": element.inner_text()})

            results.append({
                "title": title,
                "url": "__URL__",
                "timestamp": datetime.now().isoformat(),
                "data_extracted": "Edit this script to extract real data",
            })

        except Exception as e:
            print(f"Error while scraping: {e}")

        finally:
            browser.close()

    return results


def save_results(data, filename=None):
    """Save results as JSON in the persistent directory."""
    if filename is None:
        filename = f"scraping_results_{datetime.now().strftime('%Y%m%d_%H%M%S')}.json"

    filepath = f"/app/persistent/{filename}"

    with open(filepath, "w", encoding="utf-8") as f:
        json.dump(data, f, indent=2, ensure_ascii=False)

    print(f"Results saved to: {filename}")
    print(f"Total items: {len(data)}")


def main():
    data = scrape_data()

    if data:
        save_results(data)
        print("Scraping finished")
    else:
        print("No data found")


if __name__ == "__main__":
    main()
"#;

const ASYNC_TEMPLATE: &str = r#"#!/usr/bin/env python3
"""
Asynchronous Playwright scraping script.
Created: __CREATED__
"""

import asyncio
from playwright.async_api import async_playwright
import json
import time
from datetime import datetime


async def scrape_page(page, url):
    """Scrape a single page."""
    try:
        await page.goto(url, wait_until="networkidle")
        await page.wait_for_timeout(1000)

        title = await page.title()

        return {
            "url": url,
            "title": title,
            "timestamp": datetime.now().isoformat(),
        }

    except Exception as e:
        print(f"Error on {url}: {e}")
        return None


async def scrape_multiple_urls(urls):
    """Scrape several URLs in parallel."""
    print(f"Starting async scraping of {len(urls)} URLs...")

    async with async_playwright() as p:
        browser = await p.chromium.launch(headless=True)

        tasks = []
        for url in urls:
            page = await browser.new_page()
            await page.set_extra_http_headers({
                "User-Agent": "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36"
            })
            tasks.append(scrape_page(page, url))

        results = await asyncio.gather(*tasks, return_exceptions=True)
        valid_results = [r for r in results if r is not None and not isinstance(r, Exception)]

        await browser.close()

    return valid_results


async def main():
    urls = [
        "https://example.com",
        "https://httpbin.org/html",
    ]

    start_time = time.time()
    results = await scrape_multiple_urls(urls)
    end_time = time.time()

    filename = f"async_scraping_{datetime.now().strftime('%Y%m%d_%H%M%S')}.json"
    filepath = f"/app/persistent/{filename}"

    with open(filepath, "w", encoding="utf-8") as f:
        json.dump(results, f, indent=2, ensure_ascii=False)

    print(f"Finished in {end_time - start_time:.2f} seconds")
    print(f"Results saved to: {filename}")
    print(f"Total results: {len(results)}")


if __name__ == "__main__":
    asyncio.run(main())
"#;

/// Returns the fixed content of [`EXAMPLE_SCRIPT_NAME`].
pub fn example_script() -> &'static str {
    EXAMPLE_SCRIPT
}

/// Renders the synchronous single-page scraper template for `url`.
pub fn basic_template(url: &str, created_at: DateTime<Local>) -> String {
    BASIC_TEMPLATE
        .replace(CREATED_PLACEHOLDER, &format_created(created_at))
        .replace(URL_PLACEHOLDER, &escape_python_string(url))
}

/// Renders the asyncio multi-URL scraper template.
pub fn async_template(created_at: DateTime<Local>) -> String {
    ASYNC_TEMPLATE.replace(CREATED_PLACEHOLDER, &format_created(created_at))
}

/// Appends `.py` to names without an extension.
pub fn script_file_name(name: &str) -> String {
    if std::path::Path::new(name).extension().is_some() {
        name.to_string()
    } else {
        format!("{}.py", name)
    }
}

fn format_created(created_at: DateTime<Local>) -> String {
    created_at.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn escape_python_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap()
    }

    #[test]
    fn example_script_writes_to_persistent_mount() {
        let script = example_script();
        assert!(script.starts_with("#!/usr/bin/env python3"));
        assert!(script.contains("/app/persistent/example_results.json"));
    }

    #[test]
    fn basic_template_substitutes_url_and_date() {
        let script = basic_template("https://quotes.toscrape.com", fixed_time());

        assert!(script.contains("Created: 2024-03-09 14:05:00"));
        assert!(script.contains("page.goto(\"https://quotes.toscrape.com\""));
        assert!(!script.contains(URL_PLACEHOLDER));
        assert!(!script.contains(CREATED_PLACEHOLDER));
    }

    #[test]
    fn basic_template_escapes_quotes_in_url() {
        let script = basic_template("https://x.test/?q=\"a\"", fixed_time());
        assert!(script.contains("https://x.test/?q=\\\"a\\\""));
    }

    #[test]
    fn async_template_has_no_placeholders() {
        let script = async_template(fixed_time());
        assert!(script.contains("asyncio.run(main())"));
        assert!(!script.contains(CREATED_PLACEHOLDER));
    }

    #[test]
    fn script_names_get_python_extension() {
        assert_eq!(script_file_name("scraper"), "scraper.py");
        assert_eq!(script_file_name("scraper.py"), "scraper.py");
    }
}
