//! Review markup parsing
//!
//! Selectors target the hashed CSS module class names of the kununu review
//! listing. When the site ships new markup these are the only place to touch.

use std::sync::LazyLock;

use chrono::NaiveDate;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use crate::types::{ReviewRecord, Subcategory};

const REVIEW_BLOCK: &str = ".index__reviewBlock__I8pdb";
const OVERALL_SCORE: &str = ".index__score__BktQY";
const TITLE: &str = "h3.index__title__xakS9.h3-semibold";
const DATE: &str = "time[datetime]";
const EMPLOYMENT_INFO: &str = ".index__employmentInfoBlock__wuOtj";
const EMPLOYEE_TYPE: &str = "b";
const FACTOR: &str = ".index__factor__Mo6xW";
const FACTOR_TITLE: &str = ".index__title__Rq0Po";
const FACTOR_TEXT: &str = ".index__plainText__JgbHE";
const LOAD_MORE: &str = "a.index__button__2PFpW";

struct ReviewSelectors {
    review_block: Selector,
    overall_score: Selector,
    title: Selector,
    date: Selector,
    employment_info: Selector,
    employee_type: Selector,
    factor: Selector,
    factor_title: Selector,
    factor_text: Selector,
    load_more: Selector,
}

fn selector(css: &'static str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector {}: {:?}", css, e))
}

static SELECTORS: LazyLock<ReviewSelectors> = LazyLock::new(|| ReviewSelectors {
    review_block: selector(REVIEW_BLOCK),
    overall_score: selector(OVERALL_SCORE),
    title: selector(TITLE),
    date: selector(DATE),
    employment_info: selector(EMPLOYMENT_INFO),
    employee_type: selector(EMPLOYEE_TYPE),
    factor: selector(FACTOR),
    factor_title: selector(FACTOR_TITLE),
    factor_text: selector(FACTOR_TEXT),
    load_more: selector(LOAD_MORE),
});

/// Fields parsed from one review block, before an id is assigned
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReviewDraft {
    pub overall_score: Option<f64>,
    pub title: Option<String>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub employee_type: Option<String>,
    pub position: Option<String>,
    pub subcategories: Vec<Subcategory>,
}

impl ReviewDraft {
    pub fn into_record(self, review_id: String, source_url: &str) -> ReviewRecord {
        ReviewRecord {
            review_id,
            source_url: source_url.to_string(),
            overall_score: self.overall_score,
            title: self.title,
            year: self.year,
            month: self.month,
            employee_type: self.employee_type,
            position: self.position,
            subcategories: self.subcategories,
        }
    }
}

/// Answer to "is there another page?"
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextPage {
    Found(String),
    Exhausted,
    /// The control exists but its target could not be resolved
    Unknown(String),
}

/// One rendered listing page
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPage {
    pub blocks: Vec<ReviewDraft>,
    pub next_page: NextPage,
}

/// Parse a listing page into review drafts (page order) and its pagination state
pub fn parse_page(html: &str, base_url: &str) -> ParsedPage {
    let document = Html::parse_document(html);
    let blocks = document
        .select(&SELECTORS.review_block)
        .map(parse_review_block)
        .collect();
    let next_page = find_next_page(&document, base_url);
    ParsedPage { blocks, next_page }
}

fn parse_review_block(block: ElementRef<'_>) -> ReviewDraft {
    let overall_score = block
        .select(&SELECTORS.overall_score)
        .next()
        .and_then(|el| parse_score(&text_of(el)));

    let title = block
        .select(&SELECTORS.title)
        .next()
        .map(text_of)
        .filter(|t| !t.is_empty());

    let (year, month) = block
        .select(&SELECTORS.date)
        .next()
        .and_then(|el| el.value().attr("datetime"))
        .and_then(parse_year_month)
        .map_or((None, None), |(y, m)| (Some(y), Some(m)));

    let (employee_type, position) = block
        .select(&SELECTORS.employment_info)
        .next()
        .map_or((None, None), parse_employment_info);

    let subcategories = block
        .select(&SELECTORS.factor)
        .filter_map(|factor| {
            let label = factor.select(&SELECTORS.factor_title).next().map(text_of)?;
            let text = factor
                .select(&SELECTORS.factor_text)
                .next()
                .map(text_of)
                .filter(|t| !t.is_empty())?;
            Some(Subcategory::new(label, text))
        })
        .collect();

    ReviewDraft {
        overall_score,
        title,
        year,
        month,
        employee_type,
        position,
        subcategories,
    }
}

fn parse_employment_info(info: ElementRef<'_>) -> (Option<String>, Option<String>) {
    let info_text = text_of(info);
    let employee_type = info
        .select(&SELECTORS.employee_type)
        .next()
        .map(text_of)
        .filter(|t| !t.is_empty());

    let position = employee_type.as_ref().and_then(|label| {
        let rest = info_text.replacen(label.as_str(), "", 1);
        let rest = rest.trim();
        (!rest.is_empty()).then(|| rest.to_string())
    });

    (employee_type, position)
}

fn find_next_page(document: &Html, base_url: &str) -> NextPage {
    let Some(href) = document
        .select(&SELECTORS.load_more)
        .next()
        .and_then(|el| el.value().attr("href"))
        .filter(|href| !href.trim().is_empty())
    else {
        return NextPage::Exhausted;
    };

    match Url::parse(base_url).and_then(|base| base.join(href)) {
        Ok(url) => NextPage::Found(url.to_string()),
        Err(e) => NextPage::Unknown(format!("cannot resolve {:?} against {}: {}", href, base_url, e)),
    }
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// `"4,2"` -> `4.2`
pub fn parse_score(text: &str) -> Option<f64> {
    text.trim().replace(',', ".").parse::<f64>().ok()
}

/// `"2024-03-15T10:00:00+01:00"` -> `(2024, 3)`
///
/// A month outside the calendar yields `None` for both parts.
pub fn parse_year_month(datetime: &str) -> Option<(i32, u32)> {
    let date = datetime.split('T').next()?;
    let mut parts = date.split('-');
    let year = parts.next()?.trim().parse::<i32>().ok()?;
    let month = parts.next()?.trim().parse::<u32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1)?;
    Some((year, month))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://www.kununu.com";

    fn block(title: Option<&str>, datetime: Option<&str>) -> String {
        let title = title
            .map(|t| format!(r#"<h3 class="index__title__xakS9 h3-semibold"> {} </h3>"#, t))
            .unwrap_or_default();
        let date = datetime
            .map(|d| format!(r#"<time datetime="{}">März 2024</time>"#, d))
            .unwrap_or_default();
        format!(
            r#"<article class="index__reviewBlock__I8pdb">
                <span class="index__score__BktQY">4,2</span>
                {title}
                {date}
                <div class="index__employmentInfoBlock__wuOtj"><b>Angestellte/r oder Arbeiter/in</b> Hat bis 2023 im Bereich IT gearbeitet</div>
                <div class="index__factor__Mo6xW">
                    <h4 class="index__title__Rq0Po">Arbeitsatmosphäre</h4>
                    <p class="index__plainText__JgbHE">Sehr angenehm</p>
                </div>
                <div class="index__factor__Mo6xW">
                    <h4 class="index__title__Rq0Po">Kommunikation</h4>
                </div>
                <div class="index__factor__Mo6xW">
                    <p class="index__plainText__JgbHE">Ohne Titel</p>
                </div>
                <div class="index__factor__Mo6xW">
                    <h4 class="index__title__Rq0Po">Arbeitsatmosphäre</h4>
                    <p class="index__plainText__JgbHE">Nochmal</p>
                </div>
            </article>"#
        )
    }

    #[test]
    fn test_parse_full_block() {
        let html = format!(
            "<html><body>{}</body></html>",
            block(Some("Toller Arbeitgeber"), Some("2024-03-15T10:00:00+01:00"))
        );
        let page = parse_page(&html, BASE);

        assert_eq!(page.blocks.len(), 1);
        let draft = &page.blocks[0];
        assert_eq!(draft.overall_score, Some(4.2));
        assert_eq!(draft.title.as_deref(), Some("Toller Arbeitgeber"));
        assert_eq!((draft.year, draft.month), (Some(2024), Some(3)));
        assert_eq!(
            draft.employee_type.as_deref(),
            Some("Angestellte/r oder Arbeiter/in")
        );
        assert_eq!(
            draft.position.as_deref(),
            Some("Hat bis 2023 im Bereich IT gearbeitet")
        );
        assert_eq!(
            draft.subcategories,
            vec![
                Subcategory::new("Arbeitsatmosphäre", "Sehr angenehm"),
                Subcategory::new("Arbeitsatmosphäre", "Nochmal"),
            ]
        );
        assert_eq!(page.next_page, NextPage::Exhausted);
    }

    #[test]
    fn test_missing_fields_become_none() {
        let html = r#"<div class="index__reviewBlock__I8pdb"><span class="index__score__BktQY">n/a</span></div>"#;
        let page = parse_page(html, BASE);

        let draft = &page.blocks[0];
        assert_eq!(draft.overall_score, None);
        assert_eq!(draft.title, None);
        assert_eq!((draft.year, draft.month), (None, None));
        assert_eq!(draft.employee_type, None);
        assert_eq!(draft.position, None);
        assert!(draft.subcategories.is_empty());
    }

    #[test]
    fn test_blocks_keep_page_order() {
        let html = format!(
            "{}{}{}",
            block(Some("eins"), None),
            block(None, None),
            block(Some("drei"), None)
        );
        let titles: Vec<_> = parse_page(&html, BASE)
            .blocks
            .into_iter()
            .map(|d| d.title)
            .collect();
        assert_eq!(titles, vec![Some("eins".to_string()), None, Some("drei".to_string())]);
    }

    #[test]
    fn test_next_page_relative_href() {
        let html = r#"<a class="index__button__2PFpW" href="/de/acme-gmbh/kommentare/2">Mehr Bewertungen lesen</a>"#;
        assert_eq!(
            parse_page(html, BASE).next_page,
            NextPage::Found("https://www.kununu.com/de/acme-gmbh/kommentare/2".to_string())
        );
    }

    #[test]
    fn test_next_page_absolute_href_and_missing_href() {
        let html = r#"<a class="index__button__2PFpW" href="https://other.example/p/2">mehr</a>"#;
        assert_eq!(
            parse_page(html, BASE).next_page,
            NextPage::Found("https://other.example/p/2".to_string())
        );

        let html = r#"<a class="index__button__2PFpW">mehr</a>"#;
        assert_eq!(parse_page(html, BASE).next_page, NextPage::Exhausted);
    }

    #[test]
    fn test_next_page_unresolvable_base() {
        let html = r#"<a class="index__button__2PFpW" href="/de/acme/2">mehr</a>"#;
        assert!(matches!(
            parse_page(html, "not a url").next_page,
            NextPage::Unknown(_)
        ));
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_score(" 3,8 "), Some(3.8));
        assert_eq!(parse_score("5"), Some(5.0));
        assert_eq!(parse_score(""), None);
        assert_eq!(parse_year_month("2023-11-02T08:00:00Z"), Some((2023, 11)));
        assert_eq!(parse_year_month("2023-11"), Some((2023, 11)));
        assert_eq!(parse_year_month("gestern"), None);
        assert_eq!(parse_year_month("2023"), None);
        assert_eq!(parse_year_month("2024-13-01"), None);
        assert_eq!(parse_year_month("2024-00-05T00:00:00Z"), None);
    }

    #[test]
    fn test_impossible_month_leaves_date_empty() {
        let html = block(Some("Falsches Datum"), Some("2024-13-01T00:00:00Z"));
        let draft = &parse_page(&html, BASE).blocks[0];
        assert_eq!((draft.year, draft.month), (None, None));
    }
}
