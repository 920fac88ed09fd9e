//! Hardware introspection sources.
//!
//! A [`HardwareSource`] reports raw identifiers for the components that make
//! up a machine's fingerprint. Raw values never leave this layer unhashed:
//! the fingerprint generator hashes each one before composing anything.
//!
//! [`HostHardware`] reads the running machine using whatever the platform
//! offers (sysfs on Linux, CIM classes and the registry on Windows,
//! `system_profiler`/`ioreg` on macOS). [`StaticHardware`] is a fixed
//! description of a machine, used to simulate hardware in tests and tools.

use crate::error::ProbeError;
use std::fmt;
use std::process::Command;
use std::time::Duration;

/// A hardware component that contributes to the fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    Processor,
    Graphics,
    Storage,
    Motherboard,
    Network,
    MachineId,
}

impl Component {
    /// All components, in fingerprint order.
    pub const ALL: [Component; 6] = [
        Self::Processor,
        Self::Graphics,
        Self::Storage,
        Self::Motherboard,
        Self::Network,
        Self::MachineId,
    ];

    /// Short field name used in logs and reports.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processor => "cpu",
            Self::Graphics => "gpu",
            Self::Storage => "disk",
            Self::Motherboard => "motherboard",
            Self::Network => "network",
            Self::MachineId => "machine_guid",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Processor identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorInfo {
    /// Processor ID or signature.
    pub id: String,
    /// Marketing name.
    pub name: String,
}

/// A graphics adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphicsAdapter {
    pub name: String,
    pub device_id: String,
}

/// A storage device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageDevice {
    pub model: String,
    pub serial: String,
}

/// Motherboard identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardInfo {
    pub manufacturer: String,
    pub product: String,
    pub serial: String,
}

/// A physical network adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkAdapter {
    pub name: String,
    /// MAC address, if the adapter reports one.
    pub mac: Option<String>,
}

impl ProcessorInfo {
    pub(crate) fn identity(&self) -> String {
        format!("{}-{}", self.id.trim(), self.name.trim())
    }
}

impl GraphicsAdapter {
    pub(crate) fn identity(&self) -> String {
        format!("{}-{}", self.name.trim(), self.device_id.trim())
    }
}

impl StorageDevice {
    pub(crate) fn identity(&self) -> String {
        format!("{}-{}", self.model.trim(), self.serial.trim())
    }
}

impl BoardInfo {
    pub(crate) fn identity(&self) -> String {
        format!(
            "{}-{}-{}",
            self.manufacturer.trim(),
            self.product.trim(),
            self.serial.trim()
        )
    }
}

/// Source of raw hardware identifiers.
///
/// Implementations may block on OS introspection; callers bound each call
/// with a timeout.
pub trait HardwareSource: Send + Sync {
    fn processor(&self) -> Result<ProcessorInfo, ProbeError>;
    fn graphics_adapters(&self) -> Result<Vec<GraphicsAdapter>, ProbeError>;
    fn storage_devices(&self) -> Result<Vec<StorageDevice>, ProbeError>;
    fn motherboard(&self) -> Result<BoardInfo, ProbeError>;
    fn network_adapters(&self) -> Result<Vec<NetworkAdapter>, ProbeError>;
    fn machine_id(&self) -> Result<String, ProbeError>;
}

/// The machine this process runs on.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostHardware;

impl HardwareSource for HostHardware {
    fn processor(&self) -> Result<ProcessorInfo, ProbeError> {
        platform::processor()
    }

    fn graphics_adapters(&self) -> Result<Vec<GraphicsAdapter>, ProbeError> {
        platform::graphics_adapters()
    }

    fn storage_devices(&self) -> Result<Vec<StorageDevice>, ProbeError> {
        platform::storage_devices()
    }

    fn motherboard(&self) -> Result<BoardInfo, ProbeError> {
        platform::motherboard()
    }

    fn network_adapters(&self) -> Result<Vec<NetworkAdapter>, ProbeError> {
        platform::network_adapters()
    }

    fn machine_id(&self) -> Result<String, ProbeError> {
        platform::machine_id()
    }
}

/// A fixed machine description.
///
/// Components listed in `failing` report an error instead of their value,
/// and components listed in `delays` sleep before answering.
#[derive(Debug, Clone, Default)]
pub struct StaticHardware {
    pub processor: Option<ProcessorInfo>,
    pub graphics: Vec<GraphicsAdapter>,
    pub storage: Vec<StorageDevice>,
    pub board: Option<BoardInfo>,
    pub network: Vec<NetworkAdapter>,
    pub machine_id: Option<String>,
    pub failing: Vec<Component>,
    pub delays: Vec<(Component, Duration)>,
}

impl StaticHardware {
    /// A plausible desktop with one GPU, two disks and one NIC.
    #[must_use]
    pub fn workstation() -> Self {
        Self {
            processor: Some(ProcessorInfo {
                id: "BFEBFBFF000906EA".to_string(),
                name: "Intel(R) Core(TM) i7-9700K CPU @ 3.60GHz".to_string(),
            }),
            graphics: vec![GraphicsAdapter {
                name: "NVIDIA GeForce RTX 3070".to_string(),
                device_id: "VideoController1".to_string(),
            }],
            storage: vec![
                StorageDevice {
                    model: "Samsung SSD 970 EVO Plus 1TB".to_string(),
                    serial: "S4EWNX0R123456A".to_string(),
                },
                StorageDevice {
                    model: "WDC WD20EZAZ-00GGJB0".to_string(),
                    serial: "WD-WX12D80K1234".to_string(),
                },
            ],
            board: Some(BoardInfo {
                manufacturer: "ASUSTeK COMPUTER INC.".to_string(),
                product: "PRIME Z390-A".to_string(),
                serial: "190436766800123".to_string(),
            }),
            network: vec![NetworkAdapter {
                name: "Ethernet".to_string(),
                mac: Some("2C:F0:5D:11:22:33".to_string()),
            }],
            machine_id: Some("4c4c4544-0051-3510-8052-b4c04f4e3132".to_string()),
            failing: Vec::new(),
            delays: Vec::new(),
        }
    }

    /// Marks a component's probe as failing.
    #[must_use]
    pub fn with_failing(mut self, component: Component) -> Self {
        self.failing.push(component);
        self
    }

    /// Makes a component's probe sleep before answering.
    #[must_use]
    pub fn with_delay(mut self, component: Component, delay: Duration) -> Self {
        self.delays.push((component, delay));
        self
    }

    fn enter(&self, component: Component) -> Result<(), ProbeError> {
        if let Some((_, delay)) = self.delays.iter().find(|(c, _)| *c == component) {
            std::thread::sleep(*delay);
        }
        if self.failing.contains(&component) {
            return Err(ProbeError::Command {
                command: format!("simulated {component} probe"),
                detail: "access denied".to_string(),
            });
        }
        Ok(())
    }
}

impl HardwareSource for StaticHardware {
    fn processor(&self) -> Result<ProcessorInfo, ProbeError> {
        self.enter(Component::Processor)?;
        self.processor
            .clone()
            .ok_or(ProbeError::NotPresent("processor"))
    }

    fn graphics_adapters(&self) -> Result<Vec<GraphicsAdapter>, ProbeError> {
        self.enter(Component::Graphics)?;
        Ok(self.graphics.clone())
    }

    fn storage_devices(&self) -> Result<Vec<StorageDevice>, ProbeError> {
        self.enter(Component::Storage)?;
        Ok(self.storage.clone())
    }

    fn motherboard(&self) -> Result<BoardInfo, ProbeError> {
        self.enter(Component::Motherboard)?;
        self.board.clone().ok_or(ProbeError::NotPresent("motherboard"))
    }

    fn network_adapters(&self) -> Result<Vec<NetworkAdapter>, ProbeError> {
        self.enter(Component::Network)?;
        Ok(self.network.clone())
    }

    fn machine_id(&self) -> Result<String, ProbeError> {
        self.enter(Component::MachineId)?;
        self.machine_id
            .clone()
            .ok_or(ProbeError::NotPresent("machine id"))
    }
}

// ---- Output parsing helpers ----

/// Runs an introspection command and returns its stdout.
#[cfg_attr(target_os = "linux", allow(dead_code))]
fn run(program: &str, args: &[&str]) -> Result<String, ProbeError> {
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| ProbeError::Command {
            command: program.to_string(),
            detail: e.to_string(),
        })?;
    if !output.status.success() {
        return Err(ProbeError::Command {
            command: program.to_string(),
            detail: format!(
                "{}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }
    String::from_utf8(output.stdout).map_err(|e| ProbeError::Parse(e.to_string()))
}

/// Parses the first processor block of `/proc/cpuinfo`.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_cpuinfo(content: &str) -> Result<ProcessorInfo, ProbeError> {
    let mut fields = Vec::new();
    for line in content.lines() {
        if line.trim().is_empty() {
            if fields.is_empty() {
                continue;
            }
            break;
        }
        if let Some((key, value)) = line.split_once(':') {
            fields.push((key.trim(), value.trim()));
        }
    }

    let lookup = |name: &str| {
        fields
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| *v)
            .filter(|v| !v.is_empty())
    };

    // x86 exposes a vendor signature; ARM exposes implementer/part codes.
    let id = [
        "vendor_id",
        "cpu family",
        "model",
        "stepping",
        "CPU implementer",
        "CPU architecture",
        "CPU variant",
        "CPU part",
        "Serial",
    ]
    .into_iter()
    .filter_map(|k| lookup(k))
    .collect::<Vec<_>>()
    .join(":");
    let name = lookup("model name")
        .or_else(|| lookup("Hardware"))
        .or_else(|| lookup("cpu model"))
        .unwrap_or_default()
        .to_string();

    if id.is_empty() && name.is_empty() {
        return Err(ProbeError::Parse("no processor fields in cpuinfo".to_string()));
    }
    Ok(ProcessorInfo { id, name })
}

/// Splits tab-separated CIM rows into fields.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
fn parse_cim_rows(output: &str, columns: usize) -> Vec<Vec<String>> {
    output
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| {
            let mut row: Vec<String> = l.split('\t').map(|f| f.trim().to_string()).collect();
            row.resize(columns, String::new());
            row
        })
        .collect()
}

/// Extracts a value from `reg query` output.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
fn parse_reg_value(output: &str, name: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .find(|l| l.starts_with(name))
        .and_then(|l| l.split_whitespace().last())
        .map(String::from)
}

/// Groups `Key: Value` lines of `system_profiler` / `networksetup` output
/// into records, starting a new record whenever `start_key` appears.
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn parse_keyed_records(output: &str, start_key: &str) -> Vec<Vec<(String, String)>> {
    let mut records: Vec<Vec<(String, String)>> = Vec::new();
    for line in output.lines() {
        let Some((key, value)) = line.trim().split_once(':') else {
            continue;
        };
        let (key, value) = (key.trim().to_string(), value.trim().to_string());
        if key == start_key {
            records.push(Vec::new());
        }
        if let Some(current) = records.last_mut() {
            current.push((key, value));
        }
    }
    records
}

#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn record_value(record: &[(String, String)], key: &str) -> String {
    record
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.clone())
        .unwrap_or_default()
}

/// Extracts a quoted property from `ioreg` output, e.g.
/// `"IOPlatformUUID" = "..."` or `"model" = <"MacBookPro18,1">`.
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn parse_ioreg_property(output: &str, property: &str) -> Option<String> {
    let needle = format!("\"{property}\"");
    output
        .lines()
        .find(|l| l.trim_start().starts_with(&needle))
        .and_then(|l| l.split_once('='))
        .map(|(_, v)| {
            v.trim()
                .trim_start_matches('<')
                .trim_end_matches('>')
                .trim_matches('"')
                .to_string()
        })
        .filter(|v| !v.is_empty())
}

/// Normalizes a MAC address to upper-case colon form and drops null MACs.
fn normalize_mac(raw: &str) -> Option<String> {
    let mac = raw.trim().replace('-', ":").to_uppercase();
    if mac.is_empty() || mac.chars().all(|c| c == '0' || c == ':') {
        return None;
    }
    Some(mac)
}

// ---- Platform-specific implementations ----

#[cfg(target_os = "linux")]
mod platform {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn read_trimmed(path: impl AsRef<Path>) -> Option<String> {
        fs::read_to_string(path)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// Directory entries sorted by name, so adapter order is stable.
    fn sorted_entries(dir: &str) -> Result<Vec<fs::DirEntry>, ProbeError> {
        let mut entries: Vec<_> = fs::read_dir(dir)?.flatten().collect();
        entries.sort_by_key(|e| e.file_name());
        Ok(entries)
    }

    pub(super) fn processor() -> Result<ProcessorInfo, ProbeError> {
        parse_cpuinfo(&fs::read_to_string("/proc/cpuinfo")?)
    }

    pub(super) fn graphics_adapters() -> Result<Vec<GraphicsAdapter>, ProbeError> {
        let mut adapters = Vec::new();
        for entry in sorted_entries("/sys/class/drm")? {
            let name = entry.file_name().to_string_lossy().to_string();
            // cardN only; cardN-HDMI-A-1 etc. are connectors.
            if !name.starts_with("card") || name.contains('-') {
                continue;
            }
            let device = entry.path().join("device");
            let uevent = fs::read_to_string(device.join("uevent")).unwrap_or_default();
            let field = |key: &str| {
                uevent
                    .lines()
                    .find_map(|l| l.strip_prefix(key))
                    .unwrap_or_default()
                    .to_string()
            };
            let vendor = read_trimmed(device.join("vendor")).unwrap_or_default();
            let product = read_trimmed(device.join("device")).unwrap_or_default();
            adapters.push(GraphicsAdapter {
                name: format!("{} {vendor}:{product}", field("DRIVER=")),
                device_id: field("PCI_SLOT_NAME="),
            });
        }
        Ok(adapters)
    }

    pub(super) fn storage_devices() -> Result<Vec<StorageDevice>, ProbeError> {
        let mut devices = Vec::new();
        for entry in sorted_entries("/sys/block")? {
            let device = entry.path().join("device");
            // Virtual block devices (loop, ram, zram, dm) have no backing device.
            if !device.exists() {
                continue;
            }
            let model = read_trimmed(device.join("model")).unwrap_or_default();
            let serial = read_trimmed(device.join("serial"))
                .or_else(|| read_trimmed(device.join("wwid")))
                .or_else(|| read_trimmed(entry.path().join("wwid")))
                .unwrap_or_default();
            devices.push(StorageDevice { model, serial });
        }
        Ok(devices)
    }

    pub(super) fn motherboard() -> Result<BoardInfo, ProbeError> {
        let dmi = Path::new("/sys/class/dmi/id");
        let manufacturer =
            read_trimmed(dmi.join("board_vendor")).ok_or(ProbeError::NotPresent("board vendor"))?;
        let product =
            read_trimmed(dmi.join("board_name")).ok_or(ProbeError::NotPresent("board name"))?;
        // board_serial is root-only on most distributions.
        let serial = read_trimmed(dmi.join("board_serial")).unwrap_or_default();
        Ok(BoardInfo {
            manufacturer,
            product,
            serial,
        })
    }

    pub(super) fn network_adapters() -> Result<Vec<NetworkAdapter>, ProbeError> {
        let mut adapters = Vec::new();
        for entry in sorted_entries("/sys/class/net")? {
            // Physical adapters have a backing device; lo, bridges and veths do not.
            if !entry.path().join("device").exists() {
                continue;
            }
            adapters.push(NetworkAdapter {
                name: entry.file_name().to_string_lossy().to_string(),
                mac: read_trimmed(entry.path().join("address")).and_then(|m| normalize_mac(&m)),
            });
        }
        Ok(adapters)
    }

    pub(super) fn machine_id() -> Result<String, ProbeError> {
        read_trimmed("/etc/machine-id")
            .or_else(|| read_trimmed("/var/lib/dbus/machine-id"))
            .ok_or(ProbeError::NotPresent("machine id"))
    }
}

#[cfg(target_os = "windows")]
mod platform {
    use super::*;

    /// Queries a CIM class and returns one tab-separated row per instance.
    fn cim(
        class: &str,
        filter: Option<&str>,
        properties: &[&str],
    ) -> Result<Vec<Vec<String>>, ProbeError> {
        let filter = filter
            .map(|f| format!(" -Filter \"{f}\""))
            .unwrap_or_default();
        let fields = properties
            .iter()
            .map(|p| format!("$_.{p}"))
            .collect::<Vec<_>>()
            .join(", ");
        let script = format!(
            "Get-CimInstance -ClassName {class}{filter} | ForEach-Object {{ ({fields}) -join [char]9 }}"
        );
        let output = run(
            "powershell",
            &["-NoProfile", "-NonInteractive", "-Command", &script],
        )?;
        Ok(parse_cim_rows(&output, properties.len()))
    }

    pub(super) fn processor() -> Result<ProcessorInfo, ProbeError> {
        let mut rows = cim("Win32_Processor", None, &["ProcessorId", "Name"])?.into_iter();
        let row = rows.next().ok_or(ProbeError::NotPresent("processor"))?;
        Ok(ProcessorInfo {
            id: row[0].clone(),
            name: row[1].clone(),
        })
    }

    pub(super) fn graphics_adapters() -> Result<Vec<GraphicsAdapter>, ProbeError> {
        Ok(cim("Win32_VideoController", None, &["Name", "DeviceID"])?
            .into_iter()
            .map(|row| GraphicsAdapter {
                name: row[0].clone(),
                device_id: row[1].clone(),
            })
            .collect())
    }

    pub(super) fn storage_devices() -> Result<Vec<StorageDevice>, ProbeError> {
        Ok(cim("Win32_DiskDrive", None, &["Model", "SerialNumber"])?
            .into_iter()
            .map(|row| StorageDevice {
                model: row[0].clone(),
                serial: row[1].clone(),
            })
            .collect())
    }

    pub(super) fn motherboard() -> Result<BoardInfo, ProbeError> {
        let mut rows = cim(
            "Win32_BaseBoard",
            None,
            &["Manufacturer", "Product", "SerialNumber"],
        )?
        .into_iter();
        let row = rows.next().ok_or(ProbeError::NotPresent("motherboard"))?;
        Ok(BoardInfo {
            manufacturer: row[0].clone(),
            product: row[1].clone(),
            serial: row[2].clone(),
        })
    }

    pub(super) fn network_adapters() -> Result<Vec<NetworkAdapter>, ProbeError> {
        Ok(cim(
            "Win32_NetworkAdapter",
            Some("PhysicalAdapter = True"),
            &["Name", "MACAddress"],
        )?
        .into_iter()
        .map(|row| NetworkAdapter {
            name: row[0].clone(),
            mac: normalize_mac(&row[1]),
        })
        .collect())
    }

    pub(super) fn machine_id() -> Result<String, ProbeError> {
        let output = run(
            "reg",
            &[
                "query",
                r"HKLM\SOFTWARE\Microsoft\Cryptography",
                "/v",
                "MachineGuid",
            ],
        )?;
        parse_reg_value(&output, "MachineGuid").ok_or_else(|| {
            ProbeError::Parse("MachineGuid missing from registry output".to_string())
        })
    }
}

#[cfg(target_os = "macos")]
mod platform {
    use super::*;

    fn ioreg_platform() -> Result<String, ProbeError> {
        run("ioreg", &["-rd1", "-c", "IOPlatformExpertDevice"])
    }

    pub(super) fn processor() -> Result<ProcessorInfo, ProbeError> {
        let name = run("sysctl", &["-n", "machdep.cpu.brand_string"])?
            .trim()
            .to_string();
        let id = run("sysctl", &["-n", "hw.cputype", "hw.cpusubtype", "hw.cpufamily"])?
            .lines()
            .map(str::trim)
            .collect::<Vec<_>>()
            .join(":");
        Ok(ProcessorInfo { id, name })
    }

    pub(super) fn graphics_adapters() -> Result<Vec<GraphicsAdapter>, ProbeError> {
        let output = run("system_profiler", &["SPDisplaysDataType"])?;
        Ok(parse_keyed_records(&output, "Chipset Model")
            .iter()
            .map(|r| GraphicsAdapter {
                name: record_value(r, "Chipset Model"),
                device_id: record_value(r, "Device ID"),
            })
            .collect())
    }

    pub(super) fn storage_devices() -> Result<Vec<StorageDevice>, ProbeError> {
        let output = run("system_profiler", &["SPNVMeDataType", "SPSerialATADataType"])?;
        Ok(parse_keyed_records(&output, "Model")
            .iter()
            .map(|r| StorageDevice {
                model: record_value(r, "Model"),
                serial: record_value(r, "Serial Number"),
            })
            .collect())
    }

    pub(super) fn motherboard() -> Result<BoardInfo, ProbeError> {
        let output = ioreg_platform()?;
        Ok(BoardInfo {
            manufacturer: parse_ioreg_property(&output, "manufacturer").unwrap_or_default(),
            product: parse_ioreg_property(&output, "model")
                .ok_or(ProbeError::NotPresent("platform model"))?,
            serial: parse_ioreg_property(&output, "IOPlatformSerialNumber").unwrap_or_default(),
        })
    }

    pub(super) fn network_adapters() -> Result<Vec<NetworkAdapter>, ProbeError> {
        let output = run("networksetup", &["-listallhardwareports"])?;
        Ok(parse_keyed_records(&output, "Hardware Port")
            .iter()
            .map(|r| NetworkAdapter {
                name: record_value(r, "Device"),
                mac: normalize_mac(&record_value(r, "Ethernet Address")),
            })
            .collect())
    }

    pub(super) fn machine_id() -> Result<String, ProbeError> {
        parse_ioreg_property(&ioreg_platform()?, "IOPlatformUUID")
            .ok_or(ProbeError::NotPresent("platform UUID"))
    }
}

#[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
mod platform {
    use super::*;

    pub(super) fn processor() -> Result<ProcessorInfo, ProbeError> {
        Err(ProbeError::Unsupported)
    }

    pub(super) fn graphics_adapters() -> Result<Vec<GraphicsAdapter>, ProbeError> {
        Err(ProbeError::Unsupported)
    }

    pub(super) fn storage_devices() -> Result<Vec<StorageDevice>, ProbeError> {
        Err(ProbeError::Unsupported)
    }

    pub(super) fn motherboard() -> Result<BoardInfo, ProbeError> {
        Err(ProbeError::Unsupported)
    }

    pub(super) fn network_adapters() -> Result<Vec<NetworkAdapter>, ProbeError> {
        Err(ProbeError::Unsupported)
    }

    pub(super) fn machine_id() -> Result<String, ProbeError> {
        Err(ProbeError::Unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const X86_CPUINFO: &str = "processor\t: 0
vendor_id\t: GenuineIntel
cpu family\t: 6
model\t\t: 158
model name\t: Intel(R) Core(TM) i7-9700K CPU @ 3.60GHz
stepping\t: 13

processor\t: 1
vendor_id\t: GenuineIntel
model name\t: should not be read
";

    #[test]
    fn cpuinfo_reads_first_block() {
        let info = parse_cpuinfo(X86_CPUINFO).unwrap();
        assert_eq!(info.id, "GenuineIntel:6:158:13");
        assert_eq!(info.name, "Intel(R) Core(TM) i7-9700K CPU @ 3.60GHz");
    }

    #[test]
    fn cpuinfo_arm_fields() {
        let content = "processor\t: 0\nCPU implementer\t: 0x41\nCPU part\t: 0xd08\n\nHardware\t: BCM2835\nSerial\t: 10000000abcdef\n";
        let info = parse_cpuinfo(content).unwrap();
        assert_eq!(info.id, "0x41:0xd08");
        assert_eq!(info.name, "");
    }

    #[test]
    fn cpuinfo_empty_is_parse_error() {
        assert!(matches!(parse_cpuinfo(""), Err(ProbeError::Parse(_))));
    }

    #[test]
    fn cim_rows_are_padded() {
        let output = "NVIDIA GeForce RTX 3070\tVideoController1\r\nBasic Display\n\n";
        let rows = parse_cim_rows(output, 2);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["NVIDIA GeForce RTX 3070", "VideoController1"]);
        assert_eq!(rows[1], vec!["Basic Display", ""]);
    }

    #[test]
    fn reg_value_extraction() {
        let output = "\r\nHKEY_LOCAL_MACHINE\\SOFTWARE\\Microsoft\\Cryptography\r\n    MachineGuid    REG_SZ    0b1c7d3e-1111-2222-3333-444455556666\r\n";
        assert_eq!(
            parse_reg_value(output, "MachineGuid").as_deref(),
            Some("0b1c7d3e-1111-2222-3333-444455556666")
        );
        assert_eq!(parse_reg_value(output, "ProductId"), None);
    }

    #[test]
    fn keyed_records_split_on_start_key() {
        let output = "Graphics/Displays:\n\n    Apple M1:\n\n      Chipset Model: Apple M1\n      Type: GPU\n\n    Radeon:\n      Chipset Model: AMD Radeon Pro 560X\n      Device ID: 0x67ef\n";
        let records = parse_keyed_records(output, "Chipset Model");
        assert_eq!(records.len(), 2);
        assert_eq!(record_value(&records[0], "Chipset Model"), "Apple M1");
        assert_eq!(record_value(&records[0], "Device ID"), "");
        assert_eq!(record_value(&records[1], "Device ID"), "0x67ef");
    }

    #[test]
    fn ioreg_property_forms() {
        let output = "+-o J314sAP  <class IOPlatformExpertDevice>\n    {\n      \"IOPlatformUUID\" = \"A1B2C3D4-0000-1111-2222-333344445555\"\n      \"model\" = <\"MacBookPro18,1\">\n    }\n";
        assert_eq!(
            parse_ioreg_property(output, "IOPlatformUUID").as_deref(),
            Some("A1B2C3D4-0000-1111-2222-333344445555")
        );
        assert_eq!(
            parse_ioreg_property(output, "model").as_deref(),
            Some("MacBookPro18,1")
        );
        assert_eq!(parse_ioreg_property(output, "IOPlatformSerialNumber"), None);
    }

    #[test]
    fn mac_normalization() {
        assert_eq!(normalize_mac("2c:f0:5d:11:22:33\n").as_deref(), Some("2C:F0:5D:11:22:33"));
        assert_eq!(normalize_mac("2C-F0-5D-11-22-33").as_deref(), Some("2C:F0:5D:11:22:33"));
        assert_eq!(normalize_mac("00:00:00:00:00:00"), None);
        assert_eq!(normalize_mac(""), None);
    }

    #[test]
    fn identities_trim_components() {
        let board = BoardInfo {
            manufacturer: " ASUSTeK ".to_string(),
            product: "PRIME Z390-A\n".to_string(),
            serial: "123".to_string(),
        };
        assert_eq!(board.identity(), "ASUSTeK-PRIME Z390-A-123");
    }

    #[test]
    fn static_hardware_failure_injection() {
        let hw = StaticHardware::workstation().with_failing(Component::Storage);
        assert!(hw.processor().is_ok());
        assert!(hw.storage_devices().is_err());
    }
}
