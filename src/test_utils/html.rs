use scraper::{Html, Selector};

pub(crate) fn parse_html(text: &str) -> Html {
    Html::parse_document(text)
}

#[track_caller]
pub(crate) fn assert_valid_html(html: &Html) {
    assert!(
        html.errors.is_empty(),
        "Got HTML parsing errors: {:?}",
        html.errors
    );
}

#[track_caller]
pub(crate) fn assert_chart_exists(html: &Html, chart_id: &str) {
    let selector = Selector::parse(&format!("#{chart_id}")).unwrap();

    assert!(
        html.select(&selector).next().is_some(),
        "Could not find chart container #{chart_id}"
    );
}
