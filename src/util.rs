pub fn bits_to_byte(bits: &[u8]) -> u8 {
    bits.iter()
        .filter(|&&bit| bit == 0 || bit == 1)
        .fold(0, |acc, &bit| (acc << 1) | bit)
}

/// One-shot initialization slot. The initializer runs at most once; a
/// failed attempt leaves the slot empty so the next call can retry.
pub struct LazyInit<T> {
    slot: Option<T>,
}

impl<T> LazyInit<T> {
    pub fn new() -> Self {
        LazyInit { slot: None }
    }

    pub fn get_or_try_init<E, F>(&mut self, init: F) -> Result<&mut T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        match self.slot {
            Some(ref mut value) => Ok(value),
            None => {
                let value = init()?;
                Ok(self.slot.insert(value))
            }
        }
    }
}

pub fn is_raspberry_pi() -> bool {
    std::fs::read_to_string("/proc/cpuinfo")
        .map(|cpuinfo| cpuinfo_mentions_pi(&cpuinfo))
        .unwrap_or(false)
}

pub fn cpuinfo_mentions_pi(cpuinfo: &str) -> bool {
    cpuinfo.contains("Raspberry Pi")
}
