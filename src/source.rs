//! Loading of the four IMDb TSV dumps.
//!
//! A source location is either a filesystem path or an `http(s)` URL. Files
//! may be gzip-compressed; polars detects that from the magic bytes. Only the
//! columns a stage consumes are materialised, all as strings, and each stage
//! casts what it needs.

use crate::config::SourceLocations;
use crate::error::{EtlError, Result};
use polars::prelude::*;
use reqwest::blocking::Client;
use std::io::Cursor;
use std::path::Path;
use std::time::Duration;

/// One of the four input datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    TitleBasics,
    TitleRatings,
    TitleCrew,
    NameBasics,
}

impl SourceKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::TitleBasics => "title.basics",
            Self::TitleRatings => "title.ratings",
            Self::TitleCrew => "title.crew",
            Self::NameBasics => "name.basics",
        }
    }

    /// Columns read from the source; anything else in the file is skipped.
    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            Self::TitleBasics => &["tconst", "titleType", "startYear", "genres", "runtimeMinutes"],
            Self::TitleRatings => &["tconst", "averageRating", "numVotes"],
            Self::TitleCrew => &["tconst", "directors", "writers"],
            Self::NameBasics => &["nconst", "primaryName"],
        }
    }

    pub fn location(self, sources: &SourceLocations) -> &str {
        match self {
            Self::TitleBasics => &sources.title_basics,
            Self::TitleRatings => &sources.title_ratings,
            Self::TitleCrew => &sources.title_crew,
            Self::NameBasics => &sources.name_basics,
        }
    }
}

/// Reads sources for one run.
///
/// Holds the HTTP client shared by every remote load and the null token of
/// the run.
#[derive(Debug, Clone)]
pub struct SourceLoader {
    client: Client,
    null_token: String,
}

impl SourceLoader {
    /// # Errors
    ///
    /// Returns [`EtlError::Other`] if the HTTP client cannot be built.
    pub fn new(null_token: &str) -> Result<Self> {
        // The IMDb dumps take minutes to download; a load blocks until done.
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(None::<Duration>)
            .build()
            .map_err(|e| EtlError::Other(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            null_token: null_token.to_owned(),
        })
    }

    /// Load `kind` from its configured location.
    ///
    /// # Errors
    ///
    /// [`EtlError::SourceUnavailable`] when the location cannot be read or
    /// parsed, [`EtlError::SchemaMismatch`] when a required column is missing.
    pub fn load(&self, kind: SourceKind, sources: &SourceLocations) -> Result<DataFrame> {
        let location = kind.location(sources);
        tracing::info!("Loading {} from {}", kind.name(), location);
        let df = self.load_from(kind, location)?;
        tracing::info!("Loaded {} rows from {}", df.height(), kind.name());
        Ok(df)
    }

    /// Read one TSV location, projected to the columns `kind` requires.
    ///
    /// # Errors
    ///
    /// See [`SourceLoader::load`].
    pub fn load_from(&self, kind: SourceKind, location: &str) -> Result<DataFrame> {
        let unavailable = |detail: String| EtlError::SourceUnavailable {
            source: kind.name().to_owned(),
            detail,
        };

        let options = read_options(kind, &self.null_token);
        let result = if is_remote(location) {
            let bytes = self
                .download(location)
                .map_err(|e| unavailable(format!("{location}: {e}")))?;
            options.into_reader_with_file_handle(Cursor::new(bytes)).finish()
        } else {
            let file = std::fs::File::open(Path::new(location))
                .map_err(|e| unavailable(format!("{location}: {e}")))?;
            options.into_reader_with_file_handle(file).finish()
        };

        let df = result.map_err(|e| match e {
            PolarsError::ColumnNotFound(msg) => EtlError::SchemaMismatch {
                source: kind.name().to_owned(),
                column: missing_column_in(kind, &msg),
            },
            other if other.to_string().contains("unable to find column") => {
                EtlError::SchemaMismatch {
                    source: kind.name().to_owned(),
                    column: missing_column_in(kind, &other.to_string()),
                }
            }
            other => unavailable(other.to_string()),
        })?;

        check_columns(kind, &df)?;
        Ok(df)
    }

    // Hands back the response buffer itself; the compressed dump is not copied.
    fn download(&self, url: &str) -> reqwest::Result<impl AsRef<[u8]> + Send + Sync + use<>> {
        self.client.get(url).send()?.error_for_status()?.bytes()
    }
}

/// # Errors
///
/// Returns [`EtlError::SchemaMismatch`] naming the first absent column.
pub fn check_columns(kind: SourceKind, df: &DataFrame) -> Result<()> {
    let present = df.get_column_names_str();
    match kind
        .required_columns()
        .iter()
        .copied()
        .find(|required| !present.contains(required))
    {
        Some(missing) => Err(EtlError::SchemaMismatch {
            source: kind.name().to_owned(),
            column: missing.to_owned(),
        }),
        None => Ok(()),
    }
}

fn read_options(kind: SourceKind, null_token: &str) -> CsvReadOptions {
    let columns: Arc<[PlSmallStr]> = kind
        .required_columns()
        .iter()
        .map(|c| PlSmallStr::from(*c))
        .collect();

    // IMDb titles contain unbalanced quotes, so quoting is disabled outright.
    let parse_options = CsvParseOptions::default()
        .with_separator(b'\t')
        .with_quote_char(None)
        .with_null_values(Some(NullValues::AllColumnsSingle(null_token.into())));

    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0)) // all columns as String
        .with_columns(Some(columns))
        .with_parse_options(parse_options)
}

// The projection error only carries a message; recover the column name from it.
fn missing_column_in(kind: SourceKind, message: &str) -> String {
    kind.required_columns()
        .iter()
        .find(|c| message.contains(&format!("\"{c}\"")))
        .map_or_else(|| message.to_owned(), |c| (*c).to_owned())
}

fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read as _, Write as _};
    use std::net::TcpListener;

    fn loader() -> SourceLoader {
        SourceLoader::new("\\N").unwrap()
    }

    fn write_tsv(dir: &tempfile::TempDir, name: &str, body: &str) -> String {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_load_projects_and_reads_null_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tsv(
            &dir,
            "ratings.tsv",
            "tconst\taverageRating\tnumVotes\textra\ntt1\t7.5\t10\tx\ntt2\t\\N\t3\ty\n",
        );

        let df = loader().load_from(SourceKind::TitleRatings, &path).unwrap();
        assert_eq!(df.shape(), (2, 3));
        assert!(df.column("extra").is_err());
        let ratings = df
            .column("averageRating")
            .unwrap()
            .as_materialized_series()
            .str()
            .unwrap();
        assert_eq!(ratings.get(0), Some("7.5"));
        assert_eq!(ratings.get(1), None);
    }

    #[test]
    fn test_unbalanced_quotes_are_kept_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tsv(
            &dir,
            "names.tsv",
            "nconst\tprimaryName\nnm1\t\"Weird Al Yankovic\nnm2\tBob\n",
        );

        let df = loader().load_from(SourceKind::NameBasics, &path).unwrap();
        assert_eq!(df.height(), 2);
        let names = df
            .column("primaryName")
            .unwrap()
            .as_materialized_series()
            .str()
            .unwrap();
        assert_eq!(names.get(0), Some("\"Weird Al Yankovic"));
    }

    #[test]
    fn test_missing_file_is_source_unavailable() {
        let err = loader()
            .load_from(SourceKind::TitleCrew, "/nonexistent/title.crew.tsv")
            .unwrap_err();
        assert!(matches!(err, EtlError::SourceUnavailable { .. }));
    }

    #[test]
    fn test_missing_column_is_schema_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tsv(&dir, "crew.tsv", "tconst\tdirectors\ntt1\tnm1\n");

        let err = loader().load_from(SourceKind::TitleCrew, &path).unwrap_err();
        assert!(matches!(err, EtlError::SchemaMismatch { .. }), "got {err}");
    }

    #[test]
    fn test_check_columns_names_missing_column() {
        let df = df!("tconst" => ["tt1"], "directors" => ["nm1"]).unwrap();
        let err = check_columns(SourceKind::TitleCrew, &df).unwrap_err();
        match err {
            EtlError::SchemaMismatch { source, column } => {
                assert_eq!(source, "title.crew");
                assert_eq!(column, "writers");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    /// Serve `body` once over loopback HTTP, written in `chunks` pieces with
    /// `delay` before each.
    fn serve_once(status: &str, body: Vec<u8>, chunks: usize, delay: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let status = status.to_owned();

        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    return;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let head = format!(
                "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            if stream.write_all(head.as_bytes()).is_err() {
                return;
            }
            let size = body.len().div_ceil(chunks.max(1)).max(1);
            for chunk in body.chunks(size) {
                std::thread::sleep(delay);
                if stream.write_all(chunk).and_then(|()| stream.flush()).is_err() {
                    return;
                }
            }
        });

        format!("http://{addr}/source.tsv")
    }

    #[test]
    fn test_url_load_matches_file_load() {
        let gzipped = std::fs::read("testdata/name.basics.tsv.gz").unwrap();
        let url = serve_once("200 OK", gzipped, 1, Duration::ZERO);

        let loader = loader();
        let remote = loader.load_from(SourceKind::NameBasics, &url).unwrap();
        let local = loader
            .load_from(SourceKind::NameBasics, "testdata/name.basics.tsv")
            .unwrap();

        assert_eq!(remote.shape(), (5, 2));
        assert!(remote.equals_missing(&local));
    }

    #[test]
    fn test_http_error_status_is_source_unavailable() {
        let url = serve_once("404 Not Found", b"gone".to_vec(), 1, Duration::ZERO);

        let err = loader().load_from(SourceKind::TitleRatings, &url).unwrap_err();
        assert!(matches!(err, EtlError::SourceUnavailable { .. }), "got {err}");
    }

    #[test]
    fn test_slow_download_is_not_cut_off() {
        // Trickle the body for longer than reqwest's default 30s deadline.
        let body = std::fs::read("testdata/title.ratings.tsv").unwrap();
        let url = serve_once("200 OK", body, 8, Duration::from_secs(4));

        let df = loader().load_from(SourceKind::TitleRatings, &url).unwrap();
        assert_eq!(df.shape(), (4, 3));
    }
}
