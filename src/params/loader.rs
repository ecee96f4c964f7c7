//! CSV-based parameter loader
//!
//! Reads the statute-book tables from a directory, one file per table:
//! `allowances.csv`, `brackets.csv`, `usufruct_scale.csv`, `limits.csv`.
//! Used when a legislation snapshot is maintained outside the binary.

use std::collections::HashMap;
use std::error::Error;
use std::fs::File;
use std::path::Path;
use std::str::FromStr;

use rust_decimal::Decimal;

use super::{
    AllowanceTable, DeductionRules, LegalParameters, LifeInsuranceLimits, TaxBracket, TaxScale,
    UsufructScale,
};
use crate::types::{Money, Rate};

/// Load allowances from CSV: `group,amount`
pub fn load_allowances(path: &Path) -> Result<AllowanceTable, Box<dyn Error>> {
    let file = File::open(path.join("allowances.csv"))?;
    let mut reader = csv::Reader::from_reader(file);

    let mut amounts: HashMap<String, Money> = HashMap::new();
    for result in reader.records() {
        let record = result?;
        amounts.insert(record[0].to_string(), Decimal::from_str(&record[1])?);
    }

    let get = |key: &str| -> Result<Money, Box<dyn Error>> {
        amounts
            .get(key)
            .copied()
            .ok_or_else(|| format!("allowances.csv is missing group {key}").into())
    };

    Ok(AllowanceTable {
        direct_line: get("DIRECT_LINE")?,
        sibling: get("SIBLING")?,
        nephew_niece: get("NEPHEW_NIECE")?,
        stranger: get("STRANGER")?,
        disability_bonus: get("DISABILITY")?,
    })
}

/// Load brackets from CSV: `group,lower,upper,rate` (empty upper = open)
pub fn load_brackets(path: &Path) -> Result<TaxScale, Box<dyn Error>> {
    let file = File::open(path.join("brackets.csv"))?;
    let mut reader = csv::Reader::from_reader(file);

    let mut direct_line = Vec::new();
    let mut sibling = Vec::new();
    let mut nephew_niece = Vec::new();
    let mut stranger = Vec::new();

    for result in reader.records() {
        let record = result?;
        let bracket = TaxBracket {
            lower: Decimal::from_str(&record[1])?,
            upper: if record[2].is_empty() {
                None
            } else {
                Some(Decimal::from_str(&record[2])?)
            },
            rate: Decimal::from_str(&record[3])?,
        };
        match &record[0] {
            "DIRECT_LINE" => direct_line.push(bracket),
            "SIBLING" => sibling.push(bracket),
            "NEPHEW_NIECE" => nephew_niece.push(bracket),
            "STRANGER" => stranger.push(bracket),
            other => return Err(format!("brackets.csv has unknown group {other}").into()),
        }
    }

    // Bracket rows must come sorted; the walk relies on it
    for table in [&mut direct_line, &mut sibling, &mut nephew_niece, &mut stranger] {
        table.sort_by(|a, b| a.lower.cmp(&b.lower));
    }

    Ok(TaxScale {
        direct_line,
        sibling,
        nephew_niece,
        stranger,
    })
}

/// Load the usufruct age scale from CSV: `max_age,rate`
pub fn load_usufruct_scale(path: &Path) -> Result<UsufructScale, Box<dyn Error>> {
    let file = File::open(path.join("usufruct_scale.csv"))?;
    let mut reader = csv::Reader::from_reader(file);

    let mut steps: Vec<(u32, Rate)> = Vec::new();
    for result in reader.records() {
        let record = result?;
        steps.push((record[0].parse()?, Decimal::from_str(&record[1])?));
    }
    steps.sort_by_key(|&(max_age, _)| max_age);

    Ok(UsufructScale::from_steps(steps))
}

/// Load scalar limits from CSV: `key,value`
pub fn load_limits(path: &Path) -> Result<HashMap<String, Decimal>, Box<dyn Error>> {
    let file = File::open(path.join("limits.csv"))?;
    let mut reader = csv::Reader::from_reader(file);

    let mut limits = HashMap::new();
    for result in reader.records() {
        let record = result?;
        limits.insert(record[0].to_string(), Decimal::from_str(&record[1])?);
    }
    Ok(limits)
}

/// All parameter tables loaded from one directory
pub struct LoadedParameters {
    pub allowances: AllowanceTable,
    pub scale: TaxScale,
    pub usufruct: UsufructScale,
    pub limits: HashMap<String, Decimal>,
}

impl LoadedParameters {
    pub fn load_from(path: &Path) -> Result<Self, Box<dyn Error>> {
        Ok(Self {
            allowances: load_allowances(path)?,
            scale: load_brackets(path)?,
            usufruct: load_usufruct_scale(path)?,
            limits: load_limits(path)?,
        })
    }

    fn limit(&self, key: &str, fallback: Decimal) -> Decimal {
        self.limits.get(key).copied().unwrap_or(fallback)
    }
}

impl From<LoadedParameters> for LegalParameters {
    fn from(loaded: LoadedParameters) -> Self {
        let defaults_li = LifeInsuranceLimits::france_2024();
        let defaults_ded = DeductionRules::france_2024();
        let life_insurance = LifeInsuranceLimits {
            allowance_before_70: loaded.limit("LI_ALLOWANCE_BEFORE_70", defaults_li.allowance_before_70),
            allowance_after_70: loaded.limit("LI_ALLOWANCE_AFTER_70", defaults_li.allowance_after_70),
            rate_low: loaded.limit("LI_RATE_LOW", defaults_li.rate_low),
            rate_high: loaded.limit("LI_RATE_HIGH", defaults_li.rate_high),
            rate_pivot: loaded.limit("LI_RATE_PIVOT", defaults_li.rate_pivot),
            vie_generation_rebate: loaded.limit("LI_VIE_GENERATION_REBATE", defaults_li.vie_generation_rebate),
        };
        let deductions = DeductionRules {
            funeral_cap: loaded.limit("FUNERAL_CAP", defaults_ded.funeral_cap),
            dutreil_rate: loaded.limit("DUTREIL_RATE", defaults_ded.dutreil_rate),
            rural_threshold: loaded.limit("RURAL_THRESHOLD", defaults_ded.rural_threshold),
            rural_rate_low: loaded.limit("RURAL_RATE_LOW", defaults_ded.rural_rate_low),
            rural_rate_high: loaded.limit("RURAL_RATE_HIGH", defaults_ded.rural_rate_high),
            forestry_rate: loaded.limit("FORESTRY_RATE", defaults_ded.forestry_rate),
            main_residence_rebate: loaded.limit("MAIN_RESIDENCE_REBATE", defaults_ded.main_residence_rebate),
        };
        LegalParameters {
            allowances: loaded.allowances,
            scale: loaded.scale,
            usufruct: loaded.usufruct,
            life_insurance,
            deductions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::TaxGroup;
    use rust_decimal_macros::dec;
    use std::fs;

    fn write_fixture_dir() -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("succession_params_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("allowances.csv"),
            "group,amount\nDIRECT_LINE,100000\nSIBLING,15932\nNEPHEW_NIECE,7967\nSTRANGER,1594\nDISABILITY,159325\n",
        )
        .unwrap();
        fs::write(
            dir.join("brackets.csv"),
            concat!(
                "group,lower,upper,rate\n",
                "DIRECT_LINE,0,8072,0.05\n",
                "DIRECT_LINE,8072,12109,0.10\n",
                "DIRECT_LINE,12109,15932,0.15\n",
                "DIRECT_LINE,15932,552324,0.20\n",
                "DIRECT_LINE,552324,902838,0.30\n",
                "DIRECT_LINE,902838,1805677,0.40\n",
                "DIRECT_LINE,1805677,,0.45\n",
                "SIBLING,0,24430,0.35\n",
                "SIBLING,24430,,0.45\n",
                "NEPHEW_NIECE,0,,0.55\n",
                "STRANGER,0,,0.60\n",
            ),
        )
        .unwrap();
        fs::write(
            dir.join("usufruct_scale.csv"),
            "max_age,rate\n21,0.90\n31,0.80\n41,0.70\n51,0.60\n61,0.50\n71,0.40\n81,0.30\n91,0.20\n",
        )
        .unwrap();
        fs::write(
            dir.join("limits.csv"),
            "key,value\nLI_ALLOWANCE_BEFORE_70,152500\nLI_ALLOWANCE_AFTER_70,30500\nFUNERAL_CAP,1500\n",
        )
        .unwrap();
        dir
    }

    #[test]
    fn test_load_from_csv_directory() {
        let dir = write_fixture_dir();
        let params = LegalParameters::from_csv_path(&dir).unwrap();

        assert_eq!(params.allowances.direct_line, dec!(100000));
        assert_eq!(params.scale.brackets_for(TaxGroup::DirectLine).len(), 7);
        assert_eq!(params.usufruct.viager_rate(72), dec!(0.30));
        assert_eq!(params.life_insurance.allowance_before_70, dec!(152500));
        // Keys absent from limits.csv fall back to the built-in table
        assert_eq!(params.deductions.dutreil_rate, dec!(0.75));

        fs::remove_dir_all(&dir).ok();
    }
}
