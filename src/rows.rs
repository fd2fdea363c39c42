use rayon::prelude::*;
use tracing::debug;

/// One physical text line, split on whitespace. Never empty.
pub type Row = Vec<String>;

const FORM_FEED: char = '\u{c}';

/// Splits a text dump that separates pages with form feeds (as `pdftotext` writes them).
pub fn split_pages(text: &str) -> Vec<&str> {
    let mut pages = text.split(FORM_FEED).collect::<Vec<&str>>();
    // The page separator also terminates the last page
    if pages.len() > 1 && pages.last().is_some_and(|page| page.trim().is_empty()) {
        pages.pop();
    }
    pages
}

/// Tokenizes one page of extracted text into rows, dropping blank lines.
pub fn tokenize_page(text: &str) -> Vec<Row> {
    text.split('\n')
        .map(|line| {
            line.split_whitespace()
                .map(str::to_string)
                .collect::<Row>()
        })
        .filter(|row| !row.is_empty())
        .collect()
}

/// Tokenizes every page and concatenates the rows in page order.
pub fn tokenize_pages<S: AsRef<str> + Sync>(pages: &[S]) -> Vec<Row> {
    let rows: Vec<Row> = pages
        .par_iter()
        .map(|page| tokenize_page(page.as_ref()))
        .collect::<Vec<Vec<Row>>>()
        .into_iter()
        .flatten()
        .collect();
    debug!(pages = pages.len(), rows = rows.len(), "Tokenized page text");
    rows
}

/// Flattens one page into a single token stream in reading order.
pub fn page_tokens(text: &str) -> Vec<String> {
    tokenize_page(text).into_iter().flatten().collect()
}
