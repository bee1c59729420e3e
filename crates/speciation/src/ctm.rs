//! Molecular weights of global CTM aerosol tracers (MOZART, CAM-chem,
//! CAMS), used to turn mixing ratios into mass concentrations.

/// g/mol per tracer.
pub const AEROSOL_MOLECULAR_WEIGHTS: &[(&str, f64)] = &[
    ("CB1_VMR_inst", 12.0),
    ("CB2_VMR_inst", 12.0),
    ("DUST1", 34.0),
    ("DUST2", 34.0),
    ("DUST3", 34.0),
    ("DUST4", 34.0),
    ("NH4NO3_VMR_inst", 80.0),
    ("NH4_VMR_inst", 18.0),
    ("OC1_VMR_inst", 12.0),
    ("OC2_VMR_inst", 12.0),
    ("SA1_VMR_inst", 58.0),
    ("SA2_VMR_inst", 58.0),
    ("SA3_VMR_inst", 58.0),
    ("SA4_VMR_inst", 58.0),
    ("SO4_VMR_inst", 96.0),
    ("SOA_VMR_inst", 144.0),
    ("so4_a1", 96.0),
    ("so4_a2", 96.0),
    ("so4_a3", 96.0),
    ("soa1_a1", 144.0),
    ("soa1_a2", 144.0),
    ("soa2_a1", 144.0),
    ("soa2_a2", 144.0),
    ("soa3_a1", 144.0),
    ("soa3_a2", 144.0),
    ("soa4_a1", 144.0),
    ("soa4_a2", 144.0),
    ("soa5_a1", 144.0),
    ("soa5_a2", 144.0),
    ("bc_a1", 12.0),
    ("bc_a4", 12.0),
    ("dst_a1", 34.0),
    ("dst_a2", 34.0),
    ("dst_a3", 34.0),
    ("NH4", 18.0),
];

pub fn aerosol_molecular_weight(tracer: &str) -> Option<f64> {
    AEROSOL_MOLECULAR_WEIGHTS
        .iter()
        .find(|(name, _)| *name == tracer)
        .map(|&(_, mw)| mw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(aerosol_molecular_weight("SO4_VMR_inst"), Some(96.0));
        assert_eq!(aerosol_molecular_weight("bc_a1"), Some(12.0));
        assert_eq!(aerosol_molecular_weight("O3"), None);
    }
}
