//! Vehicle parameters read from the parameter tree.
//!
//! Parsing is exhaustive: every required field is checked before anything
//! is read, and all missing pairs are reported together. Derived constants
//! are written back into the tree so they can be queried like inputs.

use crate::atmosphere::Atmosphere;
use crate::controls::{ControlChannel, Swashplate};
use crate::error::{HeliError, HeliResult};
use crate::gear::{GearLeg, LandingGear};
use crate::loads::Station;
use crate::rotor::{Blade, MainRotor, TailRotor};
use crate::surfaces::{Fuselage, HorizontalTail, Surface, VerticalTail, Wing};
use crate::wind::WindModel;
use hf_core::Real;
use hf_core::units::{in_feet, inches};
use hf_project::{ParamTree, Requirement, validate_required};
use hf_sim::EngineConfig;
use nalgebra::{Matrix3, Vector3};

/// Every (node, field) pair a vehicle file must provide.
pub const REQUIRED: &[Requirement] = &[
    Requirement {
        node: "ENV",
        fields: &[
            "R", "T0", "LAPSE", "RO_SEA", "GRAV", "MAX_GR_ALT", "MIN_GR_ALT", "NS_MAX", "EW_MAX",
            "WIND_DIR", "WIND_SPD", "WIND_DIR_RND", "TURB_LVL", "HMAP_PATH", "NMAP_PATH",
        ],
    },
    Requirement {
        node: "HELI",
        fields: &[
            "HP_LOSS", "VTRANS", "FS_CG", "WL_CG", "WT", "IX", "IY", "IZ", "IXZ", "COL_OS",
            "COL_L", "COL_H", "LON_L", "LON_H", "LAT_L", "LAT_H", "PED_OS", "PED_L", "PED_H",
            "COL_COF", "LON_COF", "LAT_COF", "PED_COF",
        ],
    },
    Requirement {
        node: "TRIM",
        fields: &[
            "YAW", "YAW_RATE", "N_VEL", "E_VEL", "D_VEL", "N_POS", "E_POS", "GR_ALT", "PSI_MR",
            "PSI_TR",
        ],
    },
    Requirement {
        node: "MR",
        fields: &[
            "FS", "WL", "IS", "E", "IB", "R", "A", "RPM", "CD0", "B", "C", "TWST", "K1",
        ],
    },
    Requirement {
        node: "TR",
        fields: &["FS", "WL", "R", "A", "C", "RPM", "CD0", "TWST", "B"],
    },
    Requirement {
        node: "FUS",
        fields: &["FS", "WL", "XUU", "YVV", "ZWW", "COR"],
    },
    Requirement {
        node: "HT",
        fields: &["FS", "WL", "ZUU", "ZUW", "ZMAX"],
    },
    Requirement {
        node: "VT",
        fields: &["FS", "WL", "YUU", "YUV", "YMAX"],
    },
    Requirement {
        node: "WN",
        fields: &["FS", "WL", "ZUU", "ZUW", "ZMAX", "B"],
    },
    Requirement {
        node: "LG",
        fields: &["FS", "WL", "B", "C", "K", "MU"],
    },
    Requirement {
        node: "FLG",
        fields: &["FS", "WL", "C", "K", "MU"],
    },
];

/// Equilibrium the trim drives towards.
#[derive(Clone, Debug, PartialEq)]
pub struct TrimTargets {
    /// Heading [rad]
    pub yaw: Real,
    /// Heading rate [rad/s]
    pub yaw_rate: Real,
    /// North-east-down velocity [ft/s]
    pub ned_vel: Vector3<Real>,
    pub north: Real,
    pub east: Real,
    /// Height above ground [ft]
    pub ground_altitude: Real,
    /// Rotor azimuths [rad]
    pub psi_mr: Real,
    pub psi_tr: Real,
}

/// Terrain extent and elevation range.
#[derive(Clone, Debug, PartialEq)]
pub struct TerrainExtent {
    pub ns_max: Real,
    pub ew_max: Real,
    pub min_alt: Real,
    pub max_alt: Real,
}

/// Everything the model needs, parsed and derived.
#[derive(Clone, Debug)]
pub struct HeliParams {
    pub atmosphere: Atmosphere,
    pub terrain: TerrainExtent,
    pub wind: WindModel,
    pub trim: TrimTargets,
    pub swashplate: Swashplate,

    /// Gross weight [lbf]
    pub weight: Real,
    /// Mass [slug]
    pub mass: Real,
    pub inertia: Matrix3<Real>,
    pub inertia_inv: Matrix3<Real>,
    /// Fixed transmission loss [hp]
    pub hp_loss: Real,

    pub main_rotor: MainRotor,
    pub tail_rotor: TailRotor,
    pub fuselage: Fuselage,
    pub horizontal_tail: HorizontalTail,
    pub vertical_tail: VerticalTail,
    pub wing: Wing,
    pub gear: LandingGear,
}

struct Reader<'a> {
    tree: &'a ParamTree,
    fs_cg: Real,
    wl_cg: Real,
}

impl Reader<'_> {
    fn num(&self, node: &str, field: &str) -> HeliResult<Real> {
        Ok(self.tree.number(node, field)?)
    }

    fn station(&self, node: &str) -> HeliResult<Station> {
        Ok(Station::from_inches(
            self.num(node, "FS")?,
            self.num(node, "WL")?,
            self.fs_cg,
            self.wl_cg,
        ))
    }

    fn blade(&self, node: &str) -> HeliResult<Blade> {
        Ok(Blade {
            radius: self.num(node, "R")?,
            lift_slope: self.num(node, "A")?,
            count: self.num(node, "B")?,
            chord: self.num(node, "C")?,
            cd0: self.num(node, "CD0")?,
            twist: self.num(node, "TWST")?,
            rpm: self.num(node, "RPM")?,
        })
    }

    fn channel(&self, prefix: &str, with_offset: bool) -> HeliResult<ControlChannel> {
        let offset = if with_offset {
            self.num("HELI", &format!("{prefix}_OS"))?
        } else {
            0.0
        };
        Ok(ControlChannel {
            offset,
            low: self.num("HELI", &format!("{prefix}_L"))?,
            high: self.num("HELI", &format!("{prefix}_H"))?,
            cof: self.num("HELI", &format!("{prefix}_COF"))?,
        })
    }

    fn positive(&self, node: &'static str, field: &'static str) -> HeliResult<Real> {
        let v = self.num(node, field)?;
        if v > 0.0 {
            Ok(v)
        } else {
            Err(HeliError::InvalidParam {
                node,
                field,
                reason: "must be positive",
            })
        }
    }
}

impl HeliParams {
    /// Parse the tree and write derived constants back into it.
    pub fn from_tree(tree: &mut ParamTree) -> HeliResult<Self> {
        validate_required(tree, REQUIRED).map_err(hf_project::ProjectError::from)?;
        let params = Self::parse(tree)?;
        params.write_derived(tree);
        Ok(params)
    }

    fn parse(tree: &ParamTree) -> HeliResult<Self> {
        let r = Reader {
            tree,
            fs_cg: tree.number("HELI", "FS_CG")?,
            wl_cg: tree.number("HELI", "WL_CG")?,
        };

        let atmosphere = Atmosphere {
            gas_constant: r.positive("ENV", "R")?,
            t0: r.positive("ENV", "T0")?,
            lapse: r.positive("ENV", "LAPSE")?,
            rho_sea: r.positive("ENV", "RO_SEA")?,
            gravity: r.positive("ENV", "GRAV")?,
        };
        let terrain = TerrainExtent {
            ns_max: r.positive("ENV", "NS_MAX")?,
            ew_max: r.positive("ENV", "EW_MAX")?,
            min_alt: r.num("ENV", "MIN_GR_ALT")?,
            max_alt: r.num("ENV", "MAX_GR_ALT")?,
        };
        let wind = WindModel::new(
            r.num("ENV", "WIND_SPD")?,
            r.num("ENV", "WIND_DIR")?,
            r.num("ENV", "WIND_DIR_RND")? == 1.0,
            r.num("ENV", "TURB_LVL")?,
        )?;

        let trim = TrimTargets {
            yaw: r.num("TRIM", "YAW")?,
            yaw_rate: r.num("TRIM", "YAW_RATE")?,
            ned_vel: Vector3::new(
                r.num("TRIM", "N_VEL")?,
                r.num("TRIM", "E_VEL")?,
                r.num("TRIM", "D_VEL")?,
            ),
            north: r.num("TRIM", "N_POS")?,
            east: r.num("TRIM", "E_POS")?,
            ground_altitude: r.num("TRIM", "GR_ALT")?,
            psi_mr: r.num("TRIM", "PSI_MR")?,
            psi_tr: r.num("TRIM", "PSI_TR")?,
        };

        let swashplate = Swashplate {
            channels: [
                r.channel("COL", true)?,
                r.channel("LON", false)?,
                r.channel("LAT", false)?,
                r.channel("PED", true)?,
            ],
        };

        let weight = r.positive("HELI", "WT")?;
        let mass = weight / atmosphere.gravity;
        let ixz = r.num("HELI", "IXZ")?;
        let inertia = Matrix3::new(
            r.positive("HELI", "IX")?,
            0.0,
            -ixz,
            0.0,
            r.positive("HELI", "IY")?,
            0.0,
            -ixz,
            0.0,
            r.positive("HELI", "IZ")?,
        );
        let inertia_inv = inertia.try_inverse().ok_or(HeliError::InvalidParam {
            node: "HELI",
            field: "IXZ",
            reason: "inertia matrix is singular",
        })?;

        r.positive("MR", "R")?;
        r.positive("MR", "RPM")?;
        r.positive("MR", "IB")?;
        r.positive("TR", "R")?;
        r.positive("TR", "RPM")?;

        let main_rotor = MainRotor::new(
            r.blade("MR")?,
            r.station("MR")?,
            r.num("MR", "E")?,
            r.num("MR", "IS")?,
            r.num("MR", "IB")?,
            r.num("MR", "K1")?,
            r.num("HELI", "VTRANS")?,
        );
        let tail_rotor = TailRotor::new(r.blade("TR")?, r.station("TR")?);

        let fuselage = Fuselage {
            station: r.station("FUS")?,
            xuu: r.num("FUS", "XUU")?,
            yvv: r.num("FUS", "YVV")?,
            zww: r.num("FUS", "ZWW")?,
            correction: r.num("FUS", "COR")?,
        };
        let horizontal_tail = HorizontalTail {
            station: r.station("HT")?,
            zuu: r.num("HT", "ZUU")?,
            zuw: r.num("HT", "ZUW")?,
            zmax: r.num("HT", "ZMAX")?,
        };
        let vertical_tail = VerticalTail {
            station: r.station("VT")?,
            yuu: r.num("VT", "YUU")?,
            yuv: r.num("VT", "YUV")?,
            ymax: r.num("VT", "YMAX")?,
        };
        let wing = Wing {
            station: r.station("WN")?,
            zuu: r.num("WN", "ZUU")?,
            zuw: r.num("WN", "ZUW")?,
            zmax: r.num("WN", "ZMAX")?,
        };

        let main_gear = r.station("LG")?;
        let nose_gear = r.station("FLG")?;
        let track = in_feet(inches(r.num("LG", "B")?));
        let leg = |station: Station, lateral: Real, node: &str| -> HeliResult<GearLeg> {
            Ok(GearLeg {
                position: station.body(lateral),
                damping: r.num(node, "C")?,
                stiffness: r.num(node, "K")?,
                friction: r.num(node, "MU")?,
            })
        };
        let gear = LandingGear {
            legs: [
                leg(main_gear, 0.5 * track, "LG")?,
                leg(main_gear, -0.5 * track, "LG")?,
                leg(nose_gear, 0.0, "FLG")?,
            ],
        };

        Ok(Self {
            atmosphere,
            terrain,
            wind,
            trim,
            swashplate,
            weight,
            mass,
            inertia,
            inertia_inv,
            hp_loss: r.num("HELI", "HP_LOSS")?,
            main_rotor,
            tail_rotor,
            fuselage,
            horizontal_tail,
            vertical_tail,
            wing,
            gear,
        })
    }

    fn write_derived(&self, tree: &mut ParamTree) {
        tree.insert_number("HELI", "M", self.mass);
        for (field, value) in self.main_rotor.derived() {
            tree.insert_number("MR", field, value);
        }
        for (field, value) in self.tail_rotor.derived() {
            tree.insert_number("TR", field, value);
        }
        for (field, value) in self.fuselage.derived() {
            tree.insert_number("FUS", field, value);
        }
        for (field, value) in self.horizontal_tail.derived() {
            tree.insert_number("HT", field, value);
        }
        for (field, value) in self.vertical_tail.derived() {
            tree.insert_number("VT", field, value);
        }
        for (field, value) in self.wing.derived() {
            tree.insert_number("WN", field, value);
        }
        let [right, _, nose] = &self.gear.legs;
        tree.insert_number("LG", "LG_H", -right.position[2]);
        tree.insert_number("LG", "LG_D", -right.position[0]);
        tree.insert_number("FLG", "FLG_H", -nose.position[2]);
        tree.insert_number("FLG", "FLG_D", -nose.position[0]);
    }
}

/// Engine tuning from the optional `SIM` node.
pub fn engine_config(tree: &ParamTree) -> HeliResult<EngineConfig> {
    let mut config = EngineConfig::default();
    if tree.node("SIM").is_none() {
        return Ok(config);
    }
    let get = |field: &str| -> HeliResult<Option<Real>> {
        if tree.contains("SIM", field) {
            Ok(Some(tree.number("SIM", field)?))
        } else {
            Ok(None)
        }
    };
    if let Some(v) = get("NORM_LIMIT")? {
        config.norm_limit = v;
    }
    if let Some(v) = get("TRIM_TOL")? {
        config.trim.tolerance = v;
    }
    if let Some(v) = get("TRIM_MAX_ITER")? {
        config.trim.max_iterations = v.max(0.0) as usize;
    }
    if let Some(v) = get("TRIM_MAX_BACKTRACK")? {
        config.trim.max_backtracks = v.max(0.0) as usize;
    }
    if !(config.norm_limit > 0.0) {
        return Err(HeliError::InvalidParam {
            node: "SIM",
            field: "NORM_LIMIT",
            reason: "must be positive",
        });
    }
    Ok(config)
}
