#![allow(dead_code)]

use async_trait::async_trait;
use mpec_common::BulletinSequence;
use mpec_ingest::config::FetchConfig;
use mpec_ingest::error::FetchError;
use mpec_ingest::module::bulletin::{BulletinSource, FetchedBulletin};
use mpec_ingest::module::classify::PhaList;
use mpec_ingest::module::pipeline::IngestContext;
use mpec_ingest::module::store::BulletinStore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// One 80-column observation line observed on 2024-01-04.
pub fn obs_line(object: &str, discovery: bool, frac: &str, mag: &str, station: &str) -> String {
    let line = format!(
        "     {:<7}{} C2024 01 04{:<7}{:<33}{:<5}GV~0000{}",
        object,
        if discovery { '*' } else { ' ' },
        frac,
        " 10 00 00.00 +10 00 00.0",
        mag,
        station
    );
    assert_eq!(line.len(), 80);
    line
}

/// Discovery of K24A00B: G96 first, F51 with the discovery mark, then 703.
pub fn discovery_page(id: &str) -> String {
    [
        format!("{id} : 2024 AB"),
        "Issued 2024 Jan. 5, 12:00 UT".to_string(),
        String::new(),
        "Observations:".to_string(),
        String::new(),
        obs_line("K24A00B", false, ".10", "20.1", "G96"),
        obs_line("K24A00B", false, ".11", "20.2", "G96"),
        obs_line("K24A00B", true, ".20", "20.3", "F51"),
        obs_line("K24A00B", false, ".30", "20.5", "703"),
        String::new(),
        "Observer details:".to_string(),
        "G96 Mt. Lemmon Survey.  Observer and measurer D. C. Fuls.".to_string(),
        "   1.5-m reflector + 10K CCD.".to_string(),
        "F51 Pan-STARRS 1, Haleakala.  Observer R. Weryk.  Measurer M. Micheli.".to_string(),
        "703 Catalina Sky Survey.  Observer A. R. Gibbs.".to_string(),
        String::new(),
        "Orbital elements:".to_string(),
        "q  1.10".to_string(),
        "e  0.40".to_string(),
        "P   2.44           H   21.5           G   0.15".to_string(),
        String::new(),
        "Ephemeris:".to_string(),
        String::new(),
        format!("{:<63}M.P.E.C. {}", "Gareth V. Williams        (C) Copyright 2024 MPC", &id[5..]),
    ]
    .join("\n")
}

/// Orbit update carrying a later, non-discovery observation of K24A00B.
pub fn orbit_update_page(id: &str) -> String {
    [
        format!("{id} : 2024 AB"),
        "Issued 2024 Jan. 9, 08:30 UT".to_string(),
        String::new(),
        "Additional observations:".to_string(),
        obs_line("K24A00B", false, ".50", "20.9", "I41"),
        String::new(),
        "Observer details:".to_string(),
        "I41 Palomar Mountain--ZTF.  Observer Z. Team.".to_string(),
    ]
    .join("\n")
}

pub fn dou_page(id: &str) -> String {
    [
        format!("{id} : DAILY ORBIT UPDATE (5 Jan. UT)"),
        "Issued 2024 Jan. 5, 23:00 UT".to_string(),
        String::new(),
        "New identifications:".to_string(),
        String::new(),
        "  K24A00A = K24A00C   Smith  2024-01-05".to_string(),
        String::new(),
        "New double designations:".to_string(),
        "  K23X05C = K24A01D     Jones  2024-01-06   MPC 123456".to_string(),
        String::new(),
    ]
    .join("\n")
}

#[derive(Debug, Clone)]
enum Scripted {
    Page(String),
    Failure,
}

#[derive(Debug, Default)]
struct ScriptState {
    pages: HashMap<String, Scripted>,
    calls: Vec<String>,
}

/// In-memory archive. Unknown bulletins are reported as not published.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_page(&self, id: &str, text: String) {
        self.state.lock().unwrap().pages.insert(id.to_string(), Scripted::Page(text));
    }

    pub fn set_failure(&self, id: &str) {
        self.state.lock().unwrap().pages.insert(id.to_string(), Scripted::Failure);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }
}

#[async_trait]
impl BulletinSource for ScriptedSource {
    async fn fetch(&self, sequence: &BulletinSequence) -> Result<FetchedBulletin, FetchError> {
        let bulletin = sequence.bulletin_id();
        let mut state = self.state.lock().unwrap();
        state.calls.push(bulletin.clone());

        match state.pages.get(&bulletin) {
            Some(Scripted::Page(text)) => Ok(FetchedBulletin::new(
                *sequence,
                format!("mem://{}", bulletin),
                text.clone().into_bytes(),
            )),
            Some(Scripted::Failure) => Err(FetchError::Transient {
                bulletin,
                attempts: 3,
                message: "connection reset".to_string(),
            }),
            None => Err(FetchError::EndOfSequence { bulletin }),
        }
    }
}

pub fn fetch_config() -> FetchConfig {
    FetchConfig {
        request_delay_ms: 0,
        ..Default::default()
    }
}

pub fn context(source: &ScriptedSource) -> IngestContext<ScriptedSource> {
    let store = BulletinStore::open_in_memory().unwrap();
    IngestContext::new(source.clone(), store, PhaList::default(), fetch_config())
}
