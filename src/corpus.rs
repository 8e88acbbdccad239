//! Facilities for discovering input files, loading text corpora, and building vocabularies.

use std::fs;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use walkdir::WalkDir;

use crate::config::CorpusConfig;
use crate::error::{NgramError, Result};

/// Marker prepended to every sentence and used for context padding.
pub const SENTENCE_START: &str = "<s>";
/// Marker appended to every sentence; generation stops on it.
pub const SENTENCE_END: &str = "</s>";
/// Replacement for tokens below the vocabulary frequency threshold.
pub const UNKNOWN: &str = "<unk>";

/// A single word-level token.
pub type Token = String;
/// An ordered sequence of tokens bracketed with sentence markers.
pub type Sentence = Vec<Token>;

/// Discovers files rooted at the provided input paths according to the corpus configuration.
///
/// Directories are traversed recursively by default; set [`CorpusConfig::recursive`]
/// to `false` to limit discovery to the first level. Symlink traversal is controlled
/// through [`CorpusConfig::follow_symlinks`].
pub fn collect_corpus_paths<P: AsRef<Path>>(
    inputs: &[P],
    cfg: &CorpusConfig,
) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        let path = input.as_ref();
        if !path.exists() {
            return Err(NgramError::InvalidConfig(format!(
                "input path {path:?} does not exist"
            )));
        }
        let metadata = path
            .symlink_metadata()
            .map_err(|err| NgramError::io(err, Some(path.to_path_buf())))?;
        if metadata.is_file() {
            files.push(path.to_path_buf());
            continue;
        }
        if !metadata.is_dir() {
            continue;
        }
        let depth = if cfg.recursive { usize::MAX } else { 1 };
        let walker = WalkDir::new(path)
            .max_depth(depth)
            .follow_links(cfg.follow_symlinks);
        for entry in walker {
            let entry = entry.map_err(|err| NgramError::Internal(err.to_string()))?;
            if entry.file_type().is_file() {
                files.push(entry.path().to_path_buf());
            }
        }
    }
    if files.is_empty() {
        return Err(NgramError::InvalidConfig(
            "no files discovered in provided inputs".into(),
        ));
    }
    Ok(files)
}

/// Loads a tokenized corpus from the provided inputs.
///
/// Each non-empty line becomes one sentence: whitespace-separated tokens wrapped
/// with [`SENTENCE_START`] and [`SENTENCE_END`] markers.
pub fn load_corpus<P: AsRef<Path>>(inputs: &[P], cfg: &CorpusConfig) -> Result<Vec<Sentence>> {
    let file_paths = collect_corpus_paths(inputs, cfg)?;
    let mut sentences = Vec::new();
    for file_path in file_paths {
        let contents = fs::read_to_string(&file_path)
            .map_err(|err| NgramError::io(err, Some(file_path.clone())))?;
        for line in contents.lines() {
            let mut sentence: Sentence = vec![SENTENCE_START.to_owned()];
            sentence.extend(line.split_whitespace().map(str::to_owned));
            if sentence.len() == 1 {
                continue;
            }
            sentence.push(SENTENCE_END.to_owned());
            sentences.push(sentence);
        }
    }
    if sentences.is_empty() {
        return Err(NgramError::InvalidConfig(
            "no sentences could be loaded from inputs".into(),
        ));
    }
    Ok(sentences)
}

/// Builds a frequency-thresholded vocabulary and rewrites out-of-vocabulary tokens.
///
/// Tokens occurring fewer than `min_frequency` times are replaced with
/// [`UNKNOWN`], which is always part of the returned vocabulary. The vocabulary
/// is returned sorted so downstream sampling is deterministic under a fixed seed.
pub fn build_vocab(sentences: &[Sentence], min_frequency: u64) -> (Vec<Sentence>, Vec<Token>) {
    let mut frequencies: FxHashMap<&str, u64> = FxHashMap::default();
    for sentence in sentences {
        for token in sentence {
            *frequencies.entry(token.as_str()).or_insert(0) += 1;
        }
    }

    let rewritten = sentences
        .iter()
        .map(|sentence| {
            sentence
                .iter()
                .map(|token| {
                    if frequencies.get(token.as_str()).copied().unwrap_or(0) >= min_frequency {
                        token.clone()
                    } else {
                        UNKNOWN.to_owned()
                    }
                })
                .collect()
        })
        .collect();

    let mut vocab: Vec<Token> = frequencies
        .iter()
        .filter(|(_, &count)| count >= min_frequency)
        .map(|(token, _)| (*token).to_owned())
        .collect();
    if !vocab.iter().any(|token| token == UNKNOWN) {
        vocab.push(UNKNOWN.to_owned());
    }
    vocab.sort_unstable();
    (rewritten, vocab)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn collect_corpus_paths_discovers_files_recursively() {
        let dir = tempdir().expect("tempdir");
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).expect("create nested directory");
        let file_a = dir.path().join("a.txt");
        let file_b = nested.join("b.txt");
        fs::write(&file_a, "the cat sat\n").expect("write a");
        fs::write(&file_b, "the dog ran\n").expect("write b");

        let cfg = CorpusConfig::default();
        let mut paths = collect_corpus_paths(&[dir.path()], &cfg).expect("collect paths");
        paths.sort();
        assert_eq!(paths, vec![file_a, file_b]);
    }

    #[test]
    fn collect_corpus_paths_rejects_missing_input() {
        let cfg = CorpusConfig::default();
        let err = collect_corpus_paths(&[Path::new("/definitely/not/here")], &cfg)
            .expect_err("missing path should fail");
        assert!(matches!(err, NgramError::InvalidConfig(_)));
    }

    #[test]
    fn load_corpus_brackets_sentences_and_skips_blank_lines() {
        let dir = tempdir().expect("tempdir");
        let file = dir.path().join("corpus.txt");
        fs::write(&file, "the cat sat\n\nthe dog ran\n").expect("write corpus");

        let sentences = load_corpus(&[file], &CorpusConfig::default()).expect("load corpus");
        assert_eq!(sentences.len(), 2);
        assert_eq!(
            sentences[0],
            vec!["<s>", "the", "cat", "sat", "</s>"]
                .into_iter()
                .map(String::from)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn build_vocab_rewrites_rare_tokens() {
        let sentences: Vec<Sentence> = vec![
            vec!["<s>", "the", "cat", "</s>"],
            vec!["<s>", "the", "dog", "</s>"],
        ]
        .into_iter()
        .map(|s| s.into_iter().map(String::from).collect())
        .collect();

        let (rewritten, vocab) = build_vocab(&sentences, 2);
        assert_eq!(rewritten[0][2], UNKNOWN);
        assert_eq!(rewritten[1][2], UNKNOWN);
        assert!(vocab.contains(&UNKNOWN.to_owned()));
        assert!(vocab.contains(&"the".to_owned()));
        assert!(!vocab.contains(&"cat".to_owned()));
    }

    #[test]
    fn build_vocab_keeps_everything_at_threshold_one() {
        let sentences: Vec<Sentence> = vec![vec![
            "<s>".to_owned(),
            "one".to_owned(),
            "two".to_owned(),
            "</s>".to_owned(),
        ]];
        let (rewritten, vocab) = build_vocab(&sentences, 1);
        assert_eq!(rewritten, sentences);
        // <s>, </s>, one, two, plus the always-present <unk>
        assert_eq!(vocab.len(), 5);
    }
}
