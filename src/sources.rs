use crate::models::SearchHit;

/// Renders search hits into the tagged sources block embedded in the prompt.
/// Total over any input: absent fields render as empty strings. Values are
/// interpolated verbatim with no escaping, matching what the prompt template
/// has always carried.
pub fn format_results(results: &[SearchHit]) -> String {
    let mut formatted = String::from("<sources>");

    for result in results {
        let score = result.score.map(|s| s.to_string()).unwrap_or_default();
        formatted.push_str(&format!(
            "<result file_id='{}' file_name='{}' score='{}'>",
            result.file_id, result.filename, score
        ));

        for part in &result.content {
            formatted.push_str(&format!("<content>{}</content>", part.text));
        }

        formatted.push_str("</result>");
    }

    formatted.push_str("</sources>");
    formatted
}
