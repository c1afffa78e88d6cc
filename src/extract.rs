//! Job detail pages: fetching them and reading a [`JobRecord`] out of them.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::{ExtractionError, FetchError};
use crate::options::CrawlerOptions;
use crate::record::JobRecord;

const JOB_ID_SECTION: &str = ".col-md-12";
const POSITION_TITLE: &str = ".jobTitle";
const COMPANY_TITLE: &str = "#hiringOrganizationName";
const DESCRIPTION: &str = "#jobdescSec";
const SKILLS: &str = "#estSkillText";

const POSITION_ID_LABEL: &str = "Position Id : ";

/// Doctype fragments that leak into descriptions embedding a full document.
const BOILERPLATE: [&str; 2] = [
    r#""http://www.w3.org/TR/xhtml1/DTD/xhtml1-strict.dtd""#,
    r#"html PUBLIC "-//W3C//DTD XHTML 1.0 Strict//EN""#,
];

static JOB_ID_SECTION_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector(JOB_ID_SECTION));
static POSITION_TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector(POSITION_TITLE));
static COMPANY_TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector(COMPANY_TITLE));
static DESCRIPTION_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector(DESCRIPTION));
static SKILLS_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector(SKILLS));

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s\s+").expect("whitespace regex"));

fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static selector")
}

/// A stateless fetch of a document as served, without running its scripts.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status.is_client_error() {
            return Err(FetchError::Rejected {
                status: status.as_u16(),
            });
        }
        Ok(response.error_for_status()?.text().await?)
    }
}

/// Reads the five job fields out of a detail page.
pub fn parse_job_record(html: &str) -> Result<JobRecord, ExtractionError> {
    let document = Html::parse_document(html);

    let job_id = job_id(&document);
    let position_title = element_text(first(&document, &POSITION_TITLE_SELECTOR, POSITION_TITLE)?);
    let company_title = element_text(first(&document, &COMPANY_TITLE_SELECTOR, COMPANY_TITLE)?);

    let description = first(&document, &DESCRIPTION_SELECTOR, DESCRIPTION)?
        .text()
        .filter(|text| !matches!(*text, "" | " " | "\n"))
        .collect::<Vec<_>>()
        .join("\n");
    let description = normalize_description(&description);

    let skills = first(&document, &SKILLS_SELECTOR, SKILLS)?
        .value()
        .attr("value")
        .unwrap_or_default()
        .to_string();

    Ok(JobRecord {
        job_id,
        position_title,
        company_title,
        description,
        skills,
    })
}

fn first<'a>(
    document: &'a Html,
    selector: &Selector,
    name: &'static str,
) -> Result<ElementRef<'a>, ExtractionError> {
    document
        .select(selector)
        .next()
        .ok_or(ExtractionError::MissingElement { selector: name })
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// The number after the first "Position Id : " label, or 0.
fn job_id(document: &Html) -> i64 {
    document
        .select(&JOB_ID_SECTION_SELECTOR)
        .flat_map(|section| section.text())
        .find_map(|text| text.strip_prefix(POSITION_ID_LABEL))
        .and_then(|id| id.trim().parse().ok())
        .unwrap_or(0)
}

/// Strips doctype boilerplate, collapses whitespace runs to a single space
/// and drops a leading "html" artifact.
pub fn normalize_description(text: &str) -> String {
    let stripped = BOILERPLATE
        .iter()
        .fold(text.to_string(), |text, fragment| text.replace(fragment, ""));
    let mut description = WHITESPACE_RUN.replace_all(&stripped, " ").into_owned();
    if description
        .get(..4)
        .is_some_and(|head| head.eq_ignore_ascii_case("html"))
    {
        description.replace_range(..4, "");
    }
    description
}

pub struct RecordExtractor {
    fetcher: Arc<dyn DocumentFetcher>,
    max_tries: u32,
    retry_delay: Duration,
}

impl RecordExtractor {
    pub fn new(fetcher: Arc<dyn DocumentFetcher>, options: &CrawlerOptions) -> Self {
        Self {
            fetcher,
            max_tries: options.max_extraction_tries,
            retry_delay: options.retry_delay,
        }
    }

    pub async fn extract(&self, url: &str) -> Result<JobRecord, ExtractionError> {
        self.extract_from(url, 0).await
    }

    /// Fetches and parses `url`, starting at attempt index `first_attempt`.
    /// Indices above the retry limit are never fetched.
    pub async fn extract_from(
        &self,
        url: &str,
        first_attempt: u32,
    ) -> Result<JobRecord, ExtractionError> {
        let mut attempts = 0;
        for attempt in first_attempt..=self.max_tries {
            attempts += 1;
            match self.try_extract(url).await {
                Ok(record) => {
                    tracing::info!(url, attempt, "extract: retrieved job data");
                    return Ok(record);
                }
                Err(err) if err.is_retryable() => {
                    tracing::warn!(url, attempt, "extract: {}", err);
                }
                Err(err) => return Err(err),
            }

            if attempt < self.max_tries && !self.retry_delay.is_zero() {
                tokio::time::sleep(self.retry_delay).await;
            }
        }
        Err(ExtractionError::Exhausted { attempts })
    }

    async fn try_extract(&self, url: &str) -> Result<JobRecord, ExtractionError> {
        let html = self.fetcher.fetch(url).await?;
        parse_job_record(&html)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn detail_page(title: &str, description: &str) -> String {
        format!(
            r#"<html><body>
            <div class="col-md-12"><p>Posted 2 days ago</p><p>Position Id : 8675309</p></div>
            <h1 class="jobTitle">{title}</h1>
            <a id="hiringOrganizationName">Acme Corp</a>
            <div id="jobdescSec">{description}</div>
            <input id="estSkillText" value="Rust, SQL, Kafka">
            </body></html>"#
        )
    }

    /// Fails with a missing element `broken` times, then serves a full page.
    struct FlakyFetcher {
        broken: usize,
        calls: AtomicUsize,
    }

    impl FlakyFetcher {
        fn new(broken: usize) -> Self {
            Self {
                broken,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl DocumentFetcher for FlakyFetcher {
        async fn fetch(&self, _url: &str) -> Result<String, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.broken {
                Ok("<html><body>Loading...</body></html>".to_string())
            } else {
                Ok(detail_page("Data Engineer", "<p>Build pipelines</p>"))
            }
        }
    }

    /// Answers every request with a client error.
    struct GoneFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DocumentFetcher for GoneFetcher {
        async fn fetch(&self, _url: &str) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(FetchError::Rejected { status: 410 })
        }
    }

    fn extractor(fetcher: Arc<FlakyFetcher>) -> RecordExtractor {
        RecordExtractor::new(fetcher, &CrawlerOptions::default())
    }

    #[test]
    fn parses_all_fields() {
        let record =
            parse_job_record(&detail_page("Senior Data Engineer", "<p>Build pipelines</p>"))
                .unwrap();
        assert_eq!(
            record,
            JobRecord {
                job_id: 8675309,
                position_title: "Senior Data Engineer".to_string(),
                company_title: "Acme Corp".to_string(),
                description: "Build pipelines".to_string(),
                skills: "Rust, SQL, Kafka".to_string(),
            }
        );
    }

    #[test]
    fn unparseable_or_missing_job_id_is_zero() {
        let html = detail_page("Engineer", "x").replace("8675309", "N/A");
        assert_eq!(parse_job_record(&html).unwrap().job_id, 0);

        let html = detail_page("Engineer", "x").replace("Position Id : 8675309", "");
        assert_eq!(parse_job_record(&html).unwrap().job_id, 0);
    }

    #[test]
    fn missing_skills_attribute_is_empty() {
        let html = detail_page("Engineer", "x").replace(r#" value="Rust, SQL, Kafka""#, "");
        assert_eq!(parse_job_record(&html).unwrap().skills, "");
    }

    #[test]
    fn missing_elements_are_reported() {
        let html = detail_page("Engineer", "x").replace("hiringOrganizationName", "other");
        let err = parse_job_record(&html).unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::MissingElement {
                selector: "#hiringOrganizationName"
            }
        ));
    }

    #[test]
    fn description_joins_text_nodes() {
        let record = parse_job_record(&detail_page(
            "Engineer",
            "<p>Build pipelines.</p> <ul><li>Rust</li>\n<li>SQL</li></ul>",
        ))
        .unwrap();
        assert_eq!(record.description, "Build pipelines.\nRust\nSQL");
    }

    #[test]
    fn normalization_strips_boilerplate_and_whitespace() {
        let raw = format!(
            "HTML {}  {}\n\n  We are   hiring.\t\tApply\nnow",
            BOILERPLATE[1], BOILERPLATE[0]
        );
        let description = normalize_description(&raw);

        assert!(!description.contains(BOILERPLATE[0]));
        assert!(!description.contains(BOILERPLATE[1]));
        assert!(!description.to_lowercase().starts_with("html"));
        assert!(!WHITESPACE_RUN.is_match(&description));
        assert_eq!(description, " We are hiring. Apply\nnow");
    }

    #[test]
    fn normalization_keeps_html_inside_the_text() {
        assert_eq!(
            normalize_description("Build HTML  emails"),
            "Build HTML emails"
        );
    }

    #[tokio::test]
    async fn structural_misses_are_retried() {
        let fetcher = Arc::new(FlakyFetcher::new(3));
        let record = extractor(fetcher.clone())
            .extract("https://jobs.example/1")
            .await
            .unwrap();
        assert_eq!(record.position_title, "Data Engineer");
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn gives_up_after_attempt_ten() {
        let fetcher = Arc::new(FlakyFetcher::new(usize::MAX));
        let err = extractor(fetcher.clone())
            .extract("https://jobs.example/1")
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Exhausted { attempts: 11 }));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 11);
    }

    #[tokio::test]
    async fn attempts_past_the_limit_never_fetch() {
        let fetcher = Arc::new(FlakyFetcher::new(0));
        let err = extractor(fetcher.clone())
            .extract_from("https://jobs.example/1", 11)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Exhausted { attempts: 0 }));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rejected_pages_are_not_retried() {
        let fetcher = Arc::new(GoneFetcher {
            calls: AtomicUsize::new(0),
        });
        let err = RecordExtractor::new(fetcher.clone(), &CrawlerOptions::default())
            .extract("https://jobs.example/gone")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::Fetch(FetchError::Rejected { status: 410 })
        ));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }
}
