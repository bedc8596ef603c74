pub mod config;
pub mod error;
pub mod logging;
pub mod module;

#[cfg(test)]
pub(crate) mod testing {
    /// One 80-column observation line observed on 2024-01-04 with fixed coordinates.
    pub fn obs_line(object: &str, discovery: bool, frac: &str, mag: &str, station: &str) -> String {
        format!(
            "     {:<7}{} C2024 01 04{:<7}{:<33}{:<5}GV~0000{}",
            object,
            if discovery { '*' } else { ' ' },
            frac,
            " 10 00 00.00 +10 00 00.0",
            mag,
            station
        )
    }
}
