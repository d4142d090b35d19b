use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

pub const DEFAULT_BOOT_IMAGE: &str = "boot.img";

/// What to do with a recognised file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub ramdisk: Option<String>,
    pub patch: Option<String>,
    pub boot_image: String,
    pub has_boot_image: bool,
}

impl Default for FileInfo {
    fn default() -> Self {
        Self {
            ramdisk: None,
            patch: None,
            boot_image: DEFAULT_BOOT_IMAGE.to_owned(),
            has_boot_image: true,
        }
    }
}

/// Human readable description of the matched rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection {
    pub label: &'static str,
    pub notes: &'static [&'static str],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Supported(Detection, FileInfo),
    AlreadyDualBoot,
    Unsupported,
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Patch {
        ramdisk: Option<&'static str>,
        patch: Option<&'static str>,
        boot_image: &'static str,
        has_boot_image: bool,
    },
    Reject,
}

struct Rule {
    pattern: &'static str,
    requires: Option<&'static str>,
    label: &'static str,
    notes: &'static [&'static str],
    action: Action,
}

const fn rom(ramdisk: &'static str, patch: &'static str) -> Action {
    Action::Patch {
        ramdisk: Some(ramdisk),
        patch: Some(patch),
        boot_image: DEFAULT_BOOT_IMAGE,
        has_boot_image: true,
    }
}

const fn rom_at(ramdisk: &'static str, patch: &'static str, boot_image: &'static str) -> Action {
    Action::Patch {
        ramdisk: Some(ramdisk),
        patch: Some(patch),
        boot_image,
        has_boot_image: true,
    }
}

const fn no_boot_image(patch: &'static str) -> Action {
    Action::Patch {
        ramdisk: None,
        patch: Some(patch),
        boot_image: DEFAULT_BOOT_IMAGE,
        has_boot_image: false,
    }
}

const CM_NOTE: &[&str] = &["Using patched Cyanogenmod ramdisk"];

// Evaluated top to bottom, first match wins. Several patterns overlap.
const RULES: &[Rule] = &[
    // Custom kernels
    Rule {
        pattern: r"^.*\.img$",
        requires: None,
        label: "Detected boot.img file",
        notes: &["WILL USE CYANOGENMOD RAMDISK. USE --ramdisk TO CHOOSE ANOTHER RAMDISK"],
        action: Action::Patch {
            ramdisk: Some("cyanogenmod.dualboot.cpio"),
            patch: None,
            boot_image: DEFAULT_BOOT_IMAGE,
            has_boot_image: true,
        },
    },
    Rule {
        pattern: r"^KT-SGS4-JB4.3-AOSP-.*.zip$",
        requires: None,
        label: "Detected ktoonsez kernel zip",
        notes: &["Using patched ktoonsez ramdisk"],
        action: rom("ktoonsez.dualboot.cpio", "ktoonsez.dualboot.patch"),
    },
    Rule {
        pattern: r"^jflte[a-z]+-aosp-faux123-.*.zip$",
        requires: None,
        label: "Detected faux kernel zip",
        notes: &["Using patched Cyanogenmod ramdisk (compatible with faux)"],
        action: rom("cyanogenmod.dualboot.cpio", "faux.dualboot.patch"),
    },
    Rule {
        pattern: r"^ChronicKernel-JB4.3-AOSP-.*.zip$",
        requires: None,
        label: "Detected ChronicKernel kernel zip",
        notes: &["Using patched ChronicKernel ramdisk"],
        action: rom("chronickernel.dualboot.cpio", "chronickernel.dualboot.patch"),
    },
    Rule {
        pattern: r"^Infamous_S4_Kernel.v.*.zip$",
        requires: None,
        label: "Detected Infamous kernel zip",
        notes: &["Using patched Infamous kernel ramdisk"],
        action: rom("infamouskernel.dualboot.cpio", "infamouskernel.dualboot.patch"),
    },
    Rule {
        pattern: r"^v[0-9]+-Google-edition-ausdim-Kernel-.*.zip$",
        requires: None,
        label: "Detected Ausdim kernel zip",
        notes: &[
            "Using patched Ausdim kernel ramdisk",
            "NOTE: The ramdisk is based on Ausdim v17. If a newer version has ramdisk changes, let me know",
        ],
        action: rom("ausdim.dualboot.cpio", "ausdim.dualboot.patch"),
    },
    Rule {
        pattern: r"^.*_AdamKernel.V[0-9\.]+\.CWM\.zip$",
        requires: None,
        label: "Detected Adam kernel zip",
        notes: &["Using patched Adam kernel zip"],
        action: rom_at("adam.dualboot.cpio", "adam.dualboot.patch", "wanam/boot.img"),
    },
    // Cyanogenmod ROMs
    Rule {
        pattern: r"^cm-[0-9\.]+-[0-9]+-NIGHTLY-[a-z0-9]+.zip$",
        requires: None,
        label: "Detected official Cyanogenmod nightly ROM zip",
        notes: CM_NOTE,
        action: rom("cyanogenmod.dualboot.cpio", "cyanogenmod.dualboot.patch"),
    },
    Rule {
        pattern: r"^cm-[0-9\.]+-[0-9]+-.*.zip$",
        requires: Some("noobdev"),
        label: "ROM has built in dual boot support",
        notes: &[],
        action: Action::Reject,
    },
    Rule {
        pattern: r"^cm-[0-9\.]+-[0-9]+-.*.zip$",
        requires: None,
        label: "Detected Cyanogenmod based ROM zip",
        notes: CM_NOTE,
        action: rom("cyanogenmod.dualboot.cpio", "cyanogenmod.dualboot.patch"),
    },
    Rule {
        pattern: r"^Slim-.*.zip$",
        requires: None,
        label: "Detected Slim Bean ROM zip",
        notes: &["Using patched Cyanogenmod ramdisk (compatible with Slim Bean)"],
        action: rom("cyanogenmod.dualboot.cpio", "slim.dualboot.patch"),
    },
    // AOKP ROMs
    Rule {
        pattern: r"^aokp_[0-9\.]+_[a-z0-9]+_task650_[0-9\.]+.zip$",
        requires: None,
        label: "Detected Task650's AOKP ROM zip",
        notes: &["Using patched Task650's AOKP ramdisk"],
        action: rom("aokp-task650.dualboot.cpio", "aokp-task650.dualboot.patch"),
    },
    // PAC-Man ROMs
    Rule {
        pattern: r"^pac_[a-z0-9]+_.*.zip$",
        requires: None,
        label: "Detected PAC-Man ROM zip",
        notes: &["Using patched Cyanogenmod ramdisk (compatible with PAC-Man)"],
        action: rom("cyanogenmod.dualboot.cpio", "cyanogenmod.dualboot.patch"),
    },
    Rule {
        pattern: r"^pac_[a-z0-9]+-nightly-[0-9]+.zip$",
        requires: None,
        label: "Detected PAC-Man nightly ROM zip",
        notes: &["Using patched Cyanogenmod ramdisk (compatible with PAC-Man)"],
        action: rom("cyanogenmod.dualboot.cpio", "cyanogenmod.dualboot.patch"),
    },
    // ParanoidAndroid ROMs
    Rule {
        pattern: r"^pa_[a-z0-9]+-.*-[0-9]+.zip$",
        requires: None,
        label: "Detected ParanoidAndroid ROM zip",
        notes: &["Using patched ParanoidAndroid ramdisk"],
        action: rom("paranoidandroid.dualboot.cpio", "paranoidandroid.dualboot.patch"),
    },
    // Carbon ROMs
    Rule {
        pattern: r"CARBON-JB-.*-[a-z0-9]+\.zip",
        requires: Some("NIGHTLY"),
        label: "Detected Carbon Nightly ROM zip",
        notes: &["Using patched Carbon ramdisk"],
        action: rom("carbon.dualboot.cpio", "carbon.dualboot.patch"),
    },
    Rule {
        pattern: r"CARBON-JB-.*-[a-z0-9]+\.zip",
        requires: None,
        label: "Detected Carbon ROM zip",
        notes: &["Using patched Carbon ramdisk"],
        action: rom("carbon.dualboot.cpio", "carbon.dualboot.patch"),
    },
    // Google Edition ROMs
    Rule {
        pattern: r"^i9505-ge-untouched-4.3-.*.zip$",
        requires: None,
        label: "Detected MaKTaiL's Google Edition ROM zip",
        notes: &["Using patched Google Edition ramdisk"],
        action: rom("googleedition.dualboot.cpio", "ge-MaKTaiL.dualboot.patch"),
    },
    // MIUI ROMs
    Rule {
        pattern: r"^miuiandroid_.*.zip$",
        requires: Some("gapps"),
        label: "Detected MIUI Google Apps zip",
        notes: &[],
        action: no_boot_image("gapps-miui.dualboot.patch"),
    },
    Rule {
        pattern: r"^miuiandroid_.*.zip$",
        requires: None,
        label: "Detected MIUI ROM zip",
        notes: &["Using patched MIUI ramdisk"],
        action: rom("miui.dualboot.cpio", "miui.dualboot.patch"),
    },
    // TouchWiz ROMs
    Rule {
        pattern: r"^FoxHound_.*\.zip$",
        requires: None,
        label: "Detected FoxHound ROM zip",
        notes: &["Using patched TouchWiz kernel zip"],
        action: rom_at(
            "touchwiz.dualboot.cpio",
            "foxhound.dualboot.patch",
            "snakes/Kernels/Stock/boot.img",
        ),
    },
    // Google Apps
    Rule {
        pattern: r"^gapps-jb-[0-9]{8}-signed.zip$",
        requires: None,
        label: "Detected Cyanogenmod Google Apps zip",
        notes: &[],
        action: no_boot_image("cyanogenmod-gapps.dualboot.patch"),
    },
    Rule {
        pattern: r"^gapps-jb\([0-9\.]+\)-[0-9\.]+.zip$",
        requires: None,
        label: "Detected Task650's Google Apps zip",
        notes: &[],
        action: no_boot_image("gapps-task650.dualboot.patch"),
    },
    Rule {
        pattern: r"^Slim_AIO_gapps.*.zip$",
        requires: None,
        label: "Detected Slim Bean Google Apps zip",
        notes: &[],
        action: no_boot_image("gapps-slim.dualboot.patch"),
    },
    // SuperSU
    Rule {
        pattern: r"^UPDATE-SuperSU-v[0-9\.]+.zip$",
        requires: None,
        label: "Detected Chainfire's SuperSU zip",
        notes: &[],
        action: no_boot_image("supersu.dualboot.patch"),
    },
];

static COMPILED: LazyLock<Vec<(Regex, &'static Rule)>> = LazyLock::new(|| {
    RULES
        .iter()
        .map(|rule| {
            let regex = Regex::new(rule.pattern)
                .unwrap_or_else(|e| panic!("invalid rule pattern {}: {}", rule.pattern, e));
            (regex, rule)
        })
        .collect()
});

impl Rule {
    fn matches(&self, regex: &Regex, filename: &str) -> bool {
        regex.is_match(filename) && self.requires.is_none_or(|s| filename.contains(s))
    }

    fn classification(&self) -> Classification {
        match self.action {
            Action::Patch {
                ramdisk,
                patch,
                boot_image,
                has_boot_image,
            } => Classification::Supported(
                Detection {
                    label: self.label,
                    notes: self.notes,
                },
                FileInfo {
                    ramdisk: ramdisk.map(str::to_owned),
                    patch: patch.map(str::to_owned),
                    boot_image: boot_image.to_owned(),
                    has_boot_image,
                },
            ),
            Action::Reject => Classification::AlreadyDualBoot,
        }
    }
}

/// Classifies a file by its name. Only the final path component is looked at.
pub fn classify(path: &Path) -> Classification {
    let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
        return Classification::Unsupported;
    };
    classify_name(filename)
}

pub fn classify_name(filename: &str) -> Classification {
    COMPILED
        .iter()
        .find(|(regex, rule)| rule.matches(regex, filename))
        .map(|(_, rule)| rule.classification())
        .unwrap_or(Classification::Unsupported)
}
