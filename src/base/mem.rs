use anyhow::bail;

/// Trait for simulated backing memories.
pub trait HasMemory {
    fn read_impl(&self, addr: u64, n: usize) -> Result<Vec<u8>, anyhow::Error>;
    fn read(&self, addr: u64, n: usize) -> Result<Vec<u8>, anyhow::Error> {
        // the engine only ever issues power-of-two accesses up to one token wide
        assert!(n.is_power_of_two() && n <= 8, "access size must be 1, 2, 4 or 8 bytes");

        // a mapped address stream might do this, which we flag as a correctness issue
        if addr % n as u64 != 0 {
            bail!("unaligned memory read of size {} @ {:#010x}", n, addr);
        }

        self.read_impl(addr, n)
    }
    fn read_n<const N: usize>(&self, addr: u64) -> Result<[u8; N], anyhow::Error> {
        let bytes = self.read(addr, N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&bytes);
        Ok(out)
    }

    fn write_impl(&mut self, addr: u64, data: &[u8]) -> Result<(), anyhow::Error>;
    fn write(&mut self, addr: u64, data: &[u8]) -> Result<(), anyhow::Error> {
        let n = data.len();
        assert!(n.is_power_of_two() && n <= 8, "access size must be 1, 2, 4 or 8 bytes");

        if addr % n as u64 != 0 {
            bail!("unaligned memory write of size {} @ {:#010x}", n, addr);
        }

        self.write_impl(addr, data)
    }
    fn write_n<const N: usize>(&mut self, addr: u64, data: [u8; N]) -> Result<(), anyhow::Error> {
        self.write(addr, data.as_slice())
    }
}
