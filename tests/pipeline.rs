use async_compression::tokio::bufread::GzipEncoder;
use region_extract::transport::FetchResult;
use region_extract::{
    ExtractPath, FetchError, NdviError, Pipeline, PipelineError, RegionConfig, RunContext,
    Transport,
};
use std::cell::RefCell;
use std::path::Path;
use tempfile::TempDir;
use tokio::io::AsyncReadExt;

const REGISTRY: &str = "\
USC0000000A  40.0000 -100.0000  800.0 KS ALPHA
USC0000000B  41.0000 -101.0000  900.0 KS BRAVO
USC0000000C  41.0000  -97.0000  400.0 NE CHARLIE
";

const DAILY_A: &str = "\
\"STATION\",\"DATE\",\"PRCP\",\"TMAX\",\"TMIN\"
\"USC0000000A\",\"2022-12-31\",\"4\",\"20\",\"-50\"
\"USC0000000A\",\"2023-01-15\",\"0\",\"83\",\"-22\"
\"USC0000000A\",\"2023-01-20\",\"13\",\"41\",\"-61\"
";

const QUICKSTATS: &str = "\
STATE_ALPHA\tSTATE_NAME\tCOUNTY_NAME\tYEAR\tAGG_LEVEL_DESC\tUNIT_DESC\tSHORT_DESC\tCOMMODITY_DESC\tSTATISTICCAT_DESC\tVALUE
KS\tKANSAS\tFINNEY\t2022\tCOUNTY\tACRES\tCORN, IRRIGATED - ACRES HARVESTED\tCORN\tAREA HARVESTED\t12,500
KS\tKANSAS\tFORD\t2022\tCOUNTY\tACRES\tCORN, IRRIGATED - ACRES HARVESTED\tCORN\tAREA HARVESTED\t(D)
KS\tKANSAS\tSCOTT\t2022\tCOUNTY\tACRES\tCORN, IRRIGATED - ACRES HARVESTED\tCORN\tAREA HARVESTED\t500
NE\tNEBRASKA\tHALL\t2022\tCOUNTY\tACRES\tCORN, IRRIGATED - ACRES HARVESTED\tCORN\tAREA HARVESTED\t3,000
";

const BANDS: &str = r#"{"bands": [{"band": "250m_16_days_EVI"}, {"band": "250m_16_days_NDVI"}]}"#;
const DATES: &str = r#"{"dates": [
    {"modis_date": "A2023001", "calendar_date": "2023-01-01"},
    {"modis_date": "A2023017", "calendar_date": "2023-01-17"}
]}"#;
const SUBSET: &str = r#"{"subset": [
    {"band": "250m_16_days_NDVI", "modis_date": "A2023001", "calendar_date": "2023-01-01", "data": [3000, 5000]},
    {"band": "250m_16_days_NDVI", "modis_date": "A2023017", "calendar_date": "2023-01-17", "data": [6000]}
]}"#;

const CONFIG: &str = r#"{
    "states": ["KS"],
    "quickstats": {
        "dataset_url": "https://example.test/qs.crops_20240101.txt.gz",
        "agg_level_desc": ["COUNTY"],
        "short_desc_contains": ["IRRIGATED"]
    },
    "modis": {
        "sites": [
            {"id": "s1", "name": "North pivot", "lat": 40.1, "lon": -100.1},
            {"id": "s2", "name": "West pivot", "lat": 41.1, "lon": -101.1}
        ]
    },
    "ghcn": {"auto_select_from_sites": true, "start_date": "2023-01-01", "end_date": "2023-01-31"}
}"#;

/// In-memory stand-in for every remote source. Unrouted URLs fail like an
/// unreachable endpoint.
struct FixtureTransport {
    routes: Vec<(&'static str, Vec<u8>)>,
    requested: RefCell<Vec<String>>,
}

impl FixtureTransport {
    async fn new() -> Self {
        let mut encoder = GzipEncoder::new(QUICKSTATS.as_bytes());
        let mut dump = Vec::new();
        encoder.read_to_end(&mut dump).await.unwrap();

        Self {
            routes: vec![
                ("ghcnd-stations.txt", REGISTRY.as_bytes().to_vec()),
                ("/access/USC0000000A.csv", DAILY_A.as_bytes().to_vec()),
                ("qs.crops_20240101.txt.gz", dump),
                ("/bands", BANDS.as_bytes().to_vec()),
                ("/dates?", DATES.as_bytes().to_vec()),
                ("/subset?", SUBSET.as_bytes().to_vec()),
            ],
            requested: RefCell::new(Vec::new()),
        }
    }

    fn without(mut self, pattern: &str) -> Self {
        self.routes.retain(|(p, _)| *p != pattern);
        self
    }

    fn with_route(mut self, pattern: &'static str, body: &str) -> Self {
        self.routes.retain(|(p, _)| *p != pattern);
        self.routes.push((pattern, body.as_bytes().to_vec()));
        self
    }

    fn lookup(&self, url: &str) -> FetchResult<Vec<u8>> {
        self.requested.borrow_mut().push(url.to_string());
        self.routes
            .iter()
            .find(|(pattern, _)| url.contains(pattern))
            .map(|(_, body)| body.clone())
            .ok_or_else(|| FetchError::Unavailable {
                url: url.to_string(),
                reason: "connection refused".into(),
            })
    }
}

impl Transport for FixtureTransport {
    async fn get(&self, url: &str) -> FetchResult<Vec<u8>> {
        self.lookup(url)
    }

    async fn download(&self, url: &str, dest: &Path) -> FetchResult<u64> {
        let body = self.lookup(url)?;
        tokio::fs::write(dest, &body)
            .await
            .map_err(|source| FetchError::DownloadIo {
                url: url.to_string(),
                path: dest.to_path_buf(),
                source,
            })?;
        Ok(body.len() as u64)
    }
}

fn pipeline(
    transport: FixtureTransport,
    config: RegionConfig,
    dir: &TempDir,
) -> Pipeline<FixtureTransport> {
    Pipeline::with_transport(
        transport,
        config,
        RunContext {
            output_dir: dir.path().join("out"),
            cache_dir: dir.path().join("cache"),
        },
    )
}

fn pipeline_requests(pipeline: &Pipeline<FixtureTransport>) -> Vec<String> {
    pipeline.transport().requested.borrow().clone()
}

fn config() -> RegionConfig {
    serde_json::from_str(CONFIG).unwrap()
}

fn lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_full_run_tolerates_failing_station() -> Result<(), PipelineError> {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(FixtureTransport::new().await, config(), &dir);

    let summary = pipeline.run().await?;
    let outputs = pipeline.context().outputs();

    // Station B is the nearest to s2 but its daily file cannot be fetched.
    let weather = summary.weather.unwrap();
    assert_eq!(weather.rows, 2);
    assert_eq!(weather.skipped, ["USC0000000B"]);
    let weather_lines = lines(&outputs.weather);
    assert_eq!(weather_lines[0], "station,state,date,prcp,tmax,tmin");
    assert_eq!(weather_lines.len(), 3);
    assert_eq!(weather_lines[1], "USC0000000A,KS,2023-01-15,0,83,-22");
    assert_eq!(weather_lines[2], "USC0000000A,KS,2023-01-20,13,41,-61");

    // Only Kansas county records with a value.
    let quickstats = summary.quickstats.unwrap();
    assert_eq!(quickstats.rows, 2);
    let stats_lines = lines(&outputs.quickstats);
    assert_eq!(stats_lines.len(), 3);
    assert!(stats_lines[1].starts_with("KS,KANSAS,FINNEY,2022,"));
    let summary_lines = lines(&outputs.quickstats_summary);
    assert_eq!(summary_lines[0], "state_alpha,total_value");
    assert_eq!(summary_lines.len(), 2);
    assert!(summary_lines[1].starts_with("KS,13000"));

    let ndvi = summary.ndvi.unwrap();
    assert_eq!(ndvi.rows, 4);
    assert!(ndvi.skipped.is_empty());
    let ndvi_lines = lines(&outputs.ndvi);
    assert_eq!(ndvi_lines[0], "site_id,site_name,date,value,band,product,modis_date");
    assert!(ndvi_lines[1].starts_with("s1,North pivot,2023-01-01,4000"));
    assert!(ndvi_lines[1].ends_with(",250m_16_days_NDVI,MOD13Q1,A2023001"));

    let requested = pipeline_requests(&pipeline);
    assert!(requested.iter().any(|url| url.contains("/access/USC0000000B.csv")));
    assert_eq!(requested.iter().filter(|url| url.contains("/subset?")).count(), 2);

    // Bulk artifacts are kept for the next run.
    assert!(dir.path().join("cache").join("ghcnd_stations.bin").exists());
    assert!(dir.path().join("cache").join("qs.crops_20240101.txt.gz").exists());
    Ok(())
}

#[tokio::test]
async fn test_unreachable_sources_still_write_every_file() -> Result<(), PipelineError> {
    let dir = tempfile::tempdir().unwrap();
    let transport = FixtureTransport::new()
        .await
        .without("ghcnd-stations.txt")
        .without("qs.crops_20240101.txt.gz")
        .without("/bands");
    let pipeline = pipeline(transport, config(), &dir);

    let summary = pipeline.run().await?;
    let outputs = pipeline.context().outputs();

    assert_eq!(summary.weather.unwrap().rows, 0);
    assert_eq!(summary.quickstats.unwrap().rows, 0);
    assert_eq!(summary.ndvi.unwrap().rows, 0);
    for path in [
        &outputs.quickstats,
        &outputs.quickstats_summary,
        &outputs.weather,
        &outputs.ndvi,
    ] {
        assert_eq!(lines(path).len(), 1, "{} should be header-only", path.display());
    }
    Ok(())
}

#[tokio::test]
async fn test_explicit_stations_skip_matching() -> Result<(), PipelineError> {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config();
    config.ghcn.stations = vec!["USC0000000A".to_string()];
    config.ghcn.auto_select_from_sites = false;
    let pipeline = pipeline(FixtureTransport::new().await, config, &dir);

    let summary = pipeline.run_only(&[ExtractPath::Weather]).await?;
    let weather = summary.weather.unwrap();
    assert_eq!(weather.rows, 2);
    assert!(weather.skipped.is_empty());
    assert!(summary.quickstats.is_none());
    assert!(!pipeline.context().outputs().ndvi.exists());
    Ok(())
}

#[tokio::test]
async fn test_missing_band_aborts_run() {
    let dir = tempfile::tempdir().unwrap();
    let transport = FixtureTransport::new()
        .await
        .with_route("/bands", r#"{"bands": [{"band": "LST_Day_1km"}]}"#);
    let pipeline = pipeline(transport, config(), &dir);

    let err = pipeline.run_only(&[ExtractPath::Ndvi]).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Ndvi(NdviError::NoBandMatch { .. })
    ));
}

#[tokio::test]
async fn test_missing_dates_are_fatal_configuration() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config();
    config.ghcn.end_date = None;
    let transport = FixtureTransport::new().await;
    let pipeline = pipeline(transport, config, &dir);

    let err = pipeline.run().await.unwrap_err();
    assert_eq!(err.to_string(), "Missing ghcn.end_date in region config");
    assert!(!pipeline.context().outputs().quickstats.exists());
}
