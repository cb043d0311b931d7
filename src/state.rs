use defmt::Format;
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, mutex::Mutex};
use heapless::Vec;

use crate::config::gps::SENTENCE_CAPACITY;

// Shared between the GPS and radio tasks
#[derive(Debug, Format)]
pub struct State {
    pub sentence: Vec<u8, SENTENCE_CAPACITY>, // Last sentence that passed its checksum
    pub accepted: u32,                        // Sentences that passed
    pub rejected: u32,                        // Sentences thrown away by validation
    pub sent: u32,                            // Packets confirmed by TX_DONE
    pub faults: u32,                          // Radio recoveries and failed transmits
}

pub static STATE: Mutex<CriticalSectionRawMutex, State> = Mutex::new(State {
    sentence: Vec::new(),
    accepted: 0,
    rejected: 0,
    sent: 0,
    faults: 0,
});
