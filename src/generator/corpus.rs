use rust_embed::Embed;
use tracing::warn;

#[derive(Embed)]
#[folder = "assets/corpus/"]
struct CorpusAssets;

/// Names of the bundled corpus files, sorted.
pub fn available_corpora() -> Vec<String> {
    let mut names: Vec<String> = CorpusAssets::iter()
        .filter(|f| f.ends_with(".txt"))
        .map(|f| f.to_string())
        .collect();
    names.sort();
    names
}

/// Every bundled corpus file concatenated in name order, so a default model
/// trains the same way on every run.
pub fn default_corpus() -> String {
    let mut corpus = String::new();
    for name in available_corpora() {
        let Some(file) = CorpusAssets::get(&name) else {
            continue;
        };
        match std::str::from_utf8(file.data.as_ref()) {
            Ok(text) => {
                corpus.push_str(text);
                corpus.push('\n');
            }
            Err(err) => warn!(%name, %err, "skipping corpus file that is not utf-8"),
        }
    }
    corpus
}
