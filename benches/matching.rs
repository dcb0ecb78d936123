use criterion::{black_box, criterion_group, criterion_main, Criterion};
use region_extract::quickstats::filter::FilterCriteria;
use region_extract::quickstats::reader::TabularRecord;
use region_extract::stations::catalog::parse_catalog;
use region_extract::stations::locate_station::{nearest_station, select_stations};
use region_extract::{LatLon, RegionFilter, SiteOfInterest, StationRecord};

const REGIONS: [&str; 4] = ["KS", "NE", "CO", "OK"];

fn synthetic_catalog(count: usize) -> Vec<StationRecord> {
    (0..count)
        .map(|i| StationRecord {
            id: format!("USC{:08}", i),
            latitude: 35.0 + (i % 100) as f64 * 0.08,
            longitude: -104.0 + (i / 100) as f64 * 0.1,
            region: REGIONS[i % REGIONS.len()].to_string(),
            name: format!("STATION {}", i),
        })
        .collect()
}

fn registry_text(stations: &[StationRecord]) -> String {
    stations
        .iter()
        .map(|s| {
            format!(
                "{:<11} {:>8.4} {:>9.4} {:>6.1} {} {}",
                s.id, s.latitude, s.longitude, 500.0, s.region, s.name
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn bench_station_matching(c: &mut Criterion) {
    let catalog = synthetic_catalog(10_000);
    let sites: Vec<SiteOfInterest> = (0..20)
        .map(|i| SiteOfInterest::new(format!("s{}", i), "", 36.0 + i as f64 * 0.2, -100.5))
        .collect();
    let regions = RegionFilter::new(["KS", "NE"]);
    let text = registry_text(&catalog);

    c.bench_function("nearest_station", |b| {
        b.iter(|| nearest_station(black_box(LatLon(38.5, -99.2)), black_box(&catalog)))
    });
    c.bench_function("select_stations_nearest_to_sites", |b| {
        b.iter(|| select_stations(black_box(&sites), &regions, black_box(&catalog)))
    });
    c.bench_function("select_stations_first_per_region", |b| {
        b.iter(|| select_stations(&[], &regions, black_box(&catalog)))
    });
    c.bench_function("parse_catalog", |b| {
        b.iter(|| parse_catalog(black_box(&text), &regions))
    });
}

fn bench_record_filter(c: &mut Criterion) {
    let criteria = FilterCriteria::builder()
        .regions(RegionFilter::new(["KS", "NE"]))
        .agg_levels(vec!["COUNTY".to_string()])
        .short_desc_contains(vec!["IRRIGATED".to_string()])
        .build();
    let records: Vec<TabularRecord> = (0..1_000)
        .map(|i| {
            let value = (i * 17).to_string();
            TabularRecord::from_pairs([
                ("STATE_ALPHA", REGIONS[i % REGIONS.len()]),
                ("AGG_LEVEL_DESC", if i % 3 == 0 { "STATE" } else { "COUNTY" }),
                ("UNIT_DESC", "ACRES"),
                ("SHORT_DESC", "CORN, IRRIGATED - ACRES HARVESTED"),
                ("VALUE", value.as_str()),
            ])
        })
        .collect();

    c.bench_function("filter_criteria_matches", |b| {
        b.iter(|| {
            records
                .iter()
                .filter(|record| criteria.matches(black_box(*record)))
                .count()
        })
    });
}

criterion_group!(benches, bench_station_matching, bench_record_filter);
criterion_main!(benches);
