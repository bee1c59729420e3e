//! Emissions merging on a small synthetic domain.

use std::path::Path;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use cmaq_common::time::format_wrfchemi_timestamp;
use dataset::{open_dataset, write_dataset, Dataset, MemoryDataset, Variable};
use emissions::{
    add_biogenic, add_fire, emissions_dataset, fire_mapping, load_host_grid, megan_path, open_megan,
    vertical_columns, write_output, AnthropogenicSource, EmissionsAccumulator, EmissionsError,
    FieldShape, FireGridding, GfasProduct, InputFrequency, IoapiHeader, McipDomain, McipFile,
    McipFiles, TemporalPolicy, UnitConverter,
};
use regrid::{find_subwindow, VerticalColumn};
use speciation::{ConversionTable, MapLayout, MolecularWeights, SpeciesClass, SpeciesMap};
use tempfile::TempDir;
use test_utils::mcip::McipFixture;
use test_utils::{assert_approx_eq, axis, regular_grid, tables, write_dataset_file};

const E_NO: f64 = 2.0;
const E_CO: f64 = 5.0;
const E_PM25J: f64 = 0.5;
const E_ETH: f64 = 1.0;
const E_HC3: f64 = 3.0;

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
}

/// 2 x 3 domain of half-degree cells, 3 layers, 12 km cells.
fn fixture() -> McipFixture {
    let tflags = cmaq_common::Tflag::for_day(date());
    McipFixture {
        grid: regular_grid(-35.0, 150.0, 0.5, 0.5, 2, 3),
        cell_size: 12_000.0,
        layer_heights: vec![20.0, 80.0, 300.0],
        terrain: 10.0,
        surface_pressure: 100_000.0,
        sigma: vec![1.0, 0.99, 0.95, 0.0],
        top_pressure: 5_000.0,
        tflags,
    }
}

/// Host grid one cell larger than the domain on every side.
fn host_dims() -> (usize, usize) {
    (4, 5)
}

fn write_host(dir: &Path) {
    let host = regular_grid(-35.5, 149.5, 0.5, 0.5, 4, 5);
    let (rows, cols) = host_dims();
    let ds = MemoryDataset::new("wrfout")
        .with_variable(
            "XLAT",
            Variable::new("XLAT", &["Time", "south_north", "west_east"], &[1, rows, cols], host.lat_values().to_vec())
                .unwrap(),
        )
        .and_then(|d| {
            d.with_variable(
                "XLONG",
                Variable::new("XLONG", &["Time", "south_north", "west_east"], &[1, rows, cols], host.lon_values().to_vec())
                    .unwrap(),
            )
        })
        .unwrap();
    write_dataset_file(dir, "wrfout_d01_2024-01-10_00:00:00", &ds);
}

/// 25 hourly WRF-Chem files with constant fields.
fn write_wrfchemi(dir: &Path, no_value: f64) {
    let (rows, cols) = host_dims();
    let dims = ["Time", "emissions_zdim", "south_north", "west_east"];
    let start = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
    for h in 0..25 {
        let mut ds = MemoryDataset::new("wrfchemi");
        for (name, value) in [
            ("E_NO", no_value),
            ("E_CO", E_CO),
            ("E_PM25J", E_PM25J),
            ("E_ETH", E_ETH),
            ("E_HC3", E_HC3),
        ] {
            let var = Variable::new(name, &dims, &[1, 1, rows, cols], vec![value; rows * cols]).unwrap();
            ds.insert_variable(name, var).unwrap();
        }
        let time = start + Duration::hours(h);
        write_dataset_file(dir, &format!("wrfchemi_d01_{}", format_wrfchemi_timestamp(&time)), &ds);
    }
}

struct Scenario {
    _dir: TempDir,
    domain: McipDomain,
    files: McipFiles,
    source: AnthropogenicSource,
    converter: UnitConverter,
}

fn scenario(no_value: f64) -> Scenario {
    let dir = TempDir::new().unwrap();
    let met = dir.path().join("met");
    let emis = dir.path().join("emis");
    fixture().write(&met, "TEST_3L");
    write_host(&met);
    write_wrfchemi(&emis, no_value);

    let files = McipFiles::discover(&met).unwrap();
    let domain = McipDomain::load(&files).unwrap();
    let table = ConversionTable::parse(tables::ANTHROPOGENIC, "anthro").unwrap();
    let source = AnthropogenicSource::discover(
        &emis,
        "d01",
        table,
        InputFrequency::Hourly,
        TemporalPolicy::default(),
    )
    .unwrap();
    let converter = UnitConverter::new(domain.geometry);
    Scenario {
        _dir: dir,
        domain,
        files,
        source,
        converter,
    }
}

fn anthropogenic_accumulator(s: &Scenario) -> EmissionsAccumulator {
    let shape = FieldShape::new(25, s.domain.layers, s.domain.rows(), s.domain.cols());
    let host = load_host_grid(&[s.files.dir()], "d01").unwrap();
    let window = find_subwindow(&s.domain.grid, &host, "d01").unwrap();
    let mut acc = EmissionsAccumulator::with_species(shape, s.source.destination_species());
    s.source.accumulate(&mut acc, date(), &s.converter, &window).unwrap();
    s.source.apply_zero_fill(&mut acc);
    acc
}

// ============================================================================
// Anthropogenic speciation
// ============================================================================

#[test]
fn test_mcip_discovery() {
    let s = scenario(E_NO);
    assert_eq!(s.files.suffix(), "TEST_3L");
    assert!(s.files.exists(McipFile::GridBdy2d));
    assert_eq!(s.domain.layers, 3);
    assert_eq!((s.domain.rows(), s.domain.cols()), (2, 3));
}

#[test]
fn test_direct_species_converted_to_cmaq_units() {
    let s = scenario(E_NO);
    let field = anthropogenic_accumulator(&s).finalize();

    let gas = s.converter.gas_factor();
    let aerosol = s.converter.aerosol_factor();
    assert_approx_eq!(gas, 144.0 / 3600.0, 1e-12);

    let no = &field.get("NO").unwrap().values;
    let frame = 6;
    // surface layer, every hour
    for hour in 0..25 {
        assert_approx_eq!(no[hour * 3 * frame], E_NO * gas, 1e-12);
    }
    // layers above the WRF-Chem emission layers stay zero
    assert_eq!(no[frame], 0.0);

    let pm = field.get("APM25J").unwrap();
    assert_eq!(pm.class, SpeciesClass::Aerosol);
    assert_approx_eq!(pm.values[0], E_PM25J * aerosol, 1e-9);
}

#[test]
fn test_voc_lumping_uses_member_sum() {
    let s = scenario(E_NO);
    let field = anthropogenic_accumulator(&s).finalize();
    let gas = s.converter.gas_factor();

    let par = &field.get("PAR").unwrap().values;
    assert_approx_eq!(par[0], (E_ETH + E_HC3) * gas * 0.5, 1e-12);
    let ole = &field.get("OLE").unwrap().values;
    assert_approx_eq!(ole[0], (E_ETH + E_HC3) * gas * 0.25, 1e-12);
}

#[test]
fn test_missing_species_are_dropped_not_fatal() {
    let s = scenario(E_NO);
    assert!(s.source.table().direct.iter().all(|m| m.source != "E_MISSING"));
    assert!(!s.source.table().voc_members.contains(&"E_ABSENTVOC".to_string()));

    let field = anthropogenic_accumulator(&s).finalize();
    assert!(field.get("XYZ").is_none());
}

#[test]
fn test_zero_fill_declares_placeholders_and_keeps_existing() {
    let s = scenario(E_NO);
    let field = anthropogenic_accumulator(&s).finalize();

    let anaj = field.get("ANAJ").unwrap();
    assert_eq!(anaj.class, SpeciesClass::Aerosol);
    assert_eq!(field.total("ANAJ"), Some(0.0));
    assert_eq!(field.total("SULF"), Some(0.0));
    // CO is both converted and listed for zero-fill
    assert!(field.total("CO").unwrap() > 0.0);
}

#[test]
fn test_negative_inputs_clamped_at_finalization() {
    let s = scenario(-1.0);
    let acc = anthropogenic_accumulator(&s);
    assert!(acc.values("NO").unwrap().iter().any(|&v| v < 0.0));
    let field = acc.finalize();
    assert!(field.get("NO").unwrap().values.iter().all(|&v| v == 0.0));
}

#[test]
fn test_missing_emissions_directory() {
    let dir = TempDir::new().unwrap();
    let table = ConversionTable::parse(tables::ANTHROPOGENIC, "anthro").unwrap();
    let err = AnthropogenicSource::discover(
        &dir.path().join("absent"),
        "d01",
        table,
        InputFrequency::Hourly,
        TemporalPolicy::default(),
    )
    .unwrap_err();
    assert!(err.is_missing_input());
}

#[test]
fn test_no_temporal_match_is_fatal() {
    let s = scenario(E_NO);
    let shape = FieldShape::new(25, s.domain.layers, 2, 3);
    let host = load_host_grid(&[s.files.dir()], "d01").unwrap();
    let window = find_subwindow(&s.domain.grid, &host, "d01").unwrap();
    let mut acc = EmissionsAccumulator::with_species(shape, s.source.destination_species());
    // Three days later is neither exact nor a whole number of weeks away
    let later = date() + Duration::days(3);
    let err = s.source.accumulate(&mut acc, later, &s.converter, &window).unwrap_err();
    assert!(matches!(err, EmissionsError::NoTemporalMatch { .. }));
}

// ============================================================================
// Biogenic and fire contributions
// ============================================================================

fn megan_dataset(rows: usize, cols: usize) -> MemoryDataset {
    let dims = ["TSTEP", "LAY", "ROW", "COL"];
    let n = 24 * rows * cols;
    let mut ds = MemoryDataset::new("megan");
    for (name, value) in [("ISOP", 0.1), ("CO", 0.2), ("CH4", 9.0), ("GDAY", 1.0)] {
        let var = Variable::new(name, &dims, &[24, 1, rows, cols], vec![value; n]).unwrap();
        ds.insert_variable(name, var).unwrap();
    }
    ds
}

#[test]
fn test_sources_add_into_shared_species() {
    let s = scenario(E_NO);
    let mut acc = anthropogenic_accumulator(&s);
    let anthro_co = acc.values("CO").unwrap()[0];

    let chem = s.files.dir().join("chem");
    write_dataset(megan_path(&chem, "TEST", "CB6", date()), &megan_dataset(2, 3)).unwrap();
    let megan = open_megan(&chem, "TEST", "CB6", date()).unwrap();
    add_biogenic(&mut acc, &megan).unwrap();

    let fire_shape = FieldShape::new(1, 3, 2, 3);
    let mut fire = EmissionsAccumulator::with_species(fire_shape, [("CO", SpeciesClass::Gas), ("AECJ", SpeciesClass::Aerosol)]);
    fire.add_volume("CO", 0, &[1.0; 18], 1.0).unwrap();
    fire.add_volume("AECJ", 0, &[4.0; 18], 1.0).unwrap();
    add_fire(&mut acc, &fire.finalize()).unwrap();

    let field = acc.finalize();
    let co = &field.get("CO").unwrap().values;
    assert_approx_eq!(co[0], anthro_co + 0.2 + 1.0, 1e-12);
    // hour 24 repeats the last biogenic hour
    assert_approx_eq!(co[24 * 18], anthro_co + 0.2 + 1.0, 1e-12);
    // excluded biogenic variables never appear
    assert!(field.get("CH4").is_none());
    assert!(field.get("GDAY").is_none());
    assert_eq!(field.get("ISOP").unwrap().class, SpeciesClass::Gas);
    assert_eq!(field.get("AECJ").unwrap().class, SpeciesClass::Aerosol);
}

#[test]
fn test_missing_megan_file() {
    let dir = TempDir::new().unwrap();
    let err = open_megan(dir.path(), "TEST", "CB6", date()).unwrap_err();
    assert!(err.is_missing_input());
}

fn gfas(flux: f64) -> GfasProduct {
    let epoch = Utc.with_ymd_and_hms(1900, 1, 1, 0, 0, 0).unwrap();
    let hours = (Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap() - epoch).num_hours() as f64;
    let dims = ["initial_time0_hours", "g0_lat_1", "g0_lon_2"];
    let lat = axis(1.5, -1.0, 2);
    let lon = axis(0.5, 1.0, 2);
    let ds = MemoryDataset::new("gfas")
        .with_variable("g0_lat_1", Variable::new("g0_lat_1", &["g0_lat_1"], &[2], lat).unwrap())
        .and_then(|d| d.with_variable("g0_lon_2", Variable::new("g0_lon_2", &["g0_lon_2"], &[2], lon).unwrap()))
        .and_then(|d| {
            d.with_variable(
                "initial_time0_hours",
                Variable::new("initial_time0_hours", &["initial_time0_hours"], &[1], vec![hours]).unwrap(),
            )
        })
        .and_then(|d| {
            // 200 m injection: above the first two layer tops
            d.with_variable(
                "MAMI_GDS0_SFC_ave24h",
                Variable::new("MAMI_GDS0_SFC_ave24h", &dims, &[1, 2, 2], vec![200.0; 4]).unwrap(),
            )
        })
        .and_then(|d| d.with_variable("cofire", Variable::new("cofire", &dims, &[1, 2, 2], vec![flux; 4]).unwrap()))
        .and_then(|d| d.with_variable("bcfire", Variable::new("bcfire", &dims, &[1, 2, 2], vec![flux; 4]).unwrap()))
        .unwrap();
    GfasProduct::from_dataset(ds).unwrap()
}

#[test]
fn test_fire_gridding_conserves_mass() {
    let flux = 1.0e-9;
    let product = gfas(flux);
    // 4 x 4 half-degree cells exactly tiling the 2 x 2 one-degree source
    let dest = regular_grid(0.0, 0.0, 0.5, 0.5, 4, 4);
    let mapping = fire_mapping(&dest, &product).unwrap();
    let columns = vec![VerticalColumn::new(vec![20.0, 80.0, 300.0], 10.0).unwrap(); 16];
    let species = SpeciesMap::parse(tables::FIRE_SPECIES_MAP, "fire", MapLayout::Fire).unwrap();
    let weights = MolecularWeights::parse(tables::GC_NAMELIST, "GC").unwrap();

    let gridding = FireGridding {
        species: &species,
        weights: &weights,
        mapping: &mapping,
        columns: &columns,
        layers: 3,
    };
    let field = gridding.grid(&product, product.time_index(date())).unwrap();
    assert_eq!(field.shape().dims(), [1, 3, 4, 4]);

    let source_kg_s: f64 = product.grid().areas_m2().iter().map(|a| a * flux).sum();
    assert_approx_eq!(field.total("CO").unwrap(), source_kg_s * 1.0e3 / 28.0, 1e-6 * source_kg_s);
    assert_approx_eq!(field.total("AECJ").unwrap(), source_kg_s * 1.0e3 * 0.8, 1e-6 * source_kg_s);

    // injection at 200 m reaches layer 2 (heights 30, 90, 310 above sea level)
    let co = &field.get("CO").unwrap().values;
    let per_layer: Vec<f64> = (0..3).map(|k| co[k * 16..(k + 1) * 16].iter().sum()).collect();
    assert_approx_eq!(per_layer[0], per_layer[2], 1e-12);
    assert_approx_eq!(per_layer[1], per_layer[2], 1e-12);

    // noxfire is not in the product: NO exists but stays zero
    assert_eq!(field.total("NO"), Some(0.0));
}

#[test]
fn test_fire_gridding_with_domain_columns() {
    let s = scenario(E_NO);
    let met3d = s.files.open(McipFile::MetCro3d).unwrap();
    let cro = s.files.open(McipFile::GridCro2d).unwrap();
    let columns = vertical_columns(&met3d, &cro).unwrap();
    assert_eq!(columns.len(), 6);
    assert_eq!(columns[0].layers(), 3);
}

// ============================================================================
// Output
// ============================================================================

#[test]
fn test_merged_output_round_trip() {
    let s = scenario(E_NO);
    let field = anthropogenic_accumulator(&s).finalize();
    let header = IoapiHeader::from_mcip(&s.domain.attributes);
    let ds = emissions_dataset(&field, date(), &header).unwrap();

    let path = s.files.dir().join("out").join("mergedEmis_2024-01-10_d01_CB6.json");
    write_output(&path, &ds).unwrap();
    // second write replaces the first
    write_output(&path, &ds).unwrap();

    let back = open_dataset(&path).unwrap();
    assert_eq!(back.attr_f64("NVARS").unwrap(), field.len() as f64);
    assert_eq!(back.attr_f64("SDATE").unwrap(), 2024010.0);
    assert_eq!(back.require_variable("TFLAG").unwrap().shape, vec![25, field.len(), 2]);
    assert_eq!(back.require_variable("NO").unwrap().shape, vec![25, 3, 2, 3]);
    assert_eq!(back.attribute("GDNAM").and_then(|a| a.as_str()), Some("TESTGRID"));
}
