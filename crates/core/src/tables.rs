//! Built-in configuration tables
//!
//! Partial configuration fragments keyed by host, target, compiler,
//! compiler version, and architecture. A fragment never stands alone: the
//! composition engine in [`crate::config`] merges every fragment applicable
//! to a [`crate::spec::BuildSpec`] into one resolved configuration.
//!
//! Fragment keys prefixed with `!` are override forms: they replace the
//! accumulated value for that key wholesale instead of merging into it.

use once_cell::sync::Lazy;
use serde_json::{Map, Value, json};

/// The closed key set of a resolved configuration, with per-key defaults.
///
/// Merging is driven off this table: keys a fragment defines outside this
/// set (such as `variables` or `architectures`) never reach the resolved
/// configuration directly.
pub static KEYS: Lazy<Map<String, Value>> = Lazy::new(|| {
    object(json!({
        // Build
        "c": null,
        "cxx": null,
        "pre_build_steps": [],
        "post_build_steps": [],
        "build_env": {},
        "cmake_args": [],
        "run_tests": true,
        "build": [],
        "test": [],

        // Linux
        "use_apt": false,
        "apt_keys": [],
        "apt_repos": [],
        "apt_packages": [],

        // macOS
        "use_brew": false,
        "brew_packages": [],

        // CI
        "enabled": true,
        "image": "",
        "image_type": "",
        "compute_type": "",
        "requires_privilege": false,
    }))
});

/// Per-host configuration fragments.
pub static HOSTS: Lazy<Map<String, Value>> = Lazy::new(|| {
    object(json!({
        "linux": {
            "architectures": {
                "x86": {
                    "image": "ghcr.io/forgelabs/ubuntu-16.04:x86",
                },
                "x64": {
                    "image": "ghcr.io/forgelabs/ubuntu-16.04:x64",
                },
            },

            "cmake_args": [
                "-DPERFORM_HEADER_CHECK=ON",
            ],

            "use_apt": true,
            "apt_repos": [
                "ppa:ubuntu-toolchain-r/test",
            ],

            "image_type": "LINUX_CONTAINER",
            "compute_type": "GENERAL_SMALL",
        },
        "al2012": {
            "cmake_args": [
                "-DENABLE_SANITIZERS=OFF",
                "-DPERFORM_HEADER_CHECK=OFF",
            ],

            "image": "ghcr.io/forgelabs/al2012:x64",
            "image_type": "LINUX_CONTAINER",
            "compute_type": "GENERAL_SMALL",
        },
        "manylinux": {
            "architectures": {
                "x86": {
                    "image": "ghcr.io/forgelabs/manylinux1:x86",
                },
                "x64": {
                    "image": "ghcr.io/forgelabs/manylinux1:x64",
                },
            },

            "image_type": "LINUX_CONTAINER",
            "compute_type": "GENERAL_SMALL",
        },
        "windows": {
            "cmake_args": [
                "-DPERFORM_HEADER_CHECK=ON",
            ],

            "image_type": "WINDOWS_CONTAINER",
            "compute_type": "GENERAL_MEDIUM",
        },
        "macos": {
            "use_brew": true,
        },
    }))
});

/// Per-target configuration fragments.
pub static TARGETS: Lazy<Map<String, Value>> = Lazy::new(|| {
    object(json!({
        "linux": {
            "architectures": {
                "x86": {
                    "cmake_args": [
                        "-DCMAKE_C_FLAGS=-m32",
                        "-DCMAKE_CXX_FLAGS=-m32",
                    ],
                },
            },

            "cmake_args": [
                "-DENABLE_SANITIZERS=ON",
            ],
        },
        "macos": {
            "architectures": {
                "x86": {
                    "cmake_args": [
                        "-DCMAKE_C_FLAGS=-m32",
                        "-DCMAKE_CXX_FLAGS=-m32",
                    ],
                },
            },
        },
        "android": {
            "cmake_args": [
                "-DTARGET_ARCH=ANDROID",
                "-DCMAKE_TOOLCHAIN_FILE=/opt/android-ndk/build/cmake/android.toolchain.cmake",
                "-DANDROID_NDK=/opt/android-ndk",
            ],
            // Cross-compiled binaries cannot run on the build host.
            "run_tests": false,

            "architectures": {
                "arm64v8a": {
                    "cmake_args": [
                        "-DANDROID_ABI=arm64-v8a",
                    ],
                },
            },

            "image_type": "LINUX_CONTAINER",
            "compute_type": "GENERAL_SMALL",
        },
        "windows": {
            "variables": {
                "exe": ".exe",
            },
        },
    }))
});

/// Per-compiler configuration fragments, with nested per-version fragments.
pub static COMPILERS: Lazy<Map<String, Value>> = Lazy::new(|| {
    object(json!({
        "default": {
            "hosts": ["macos", "al2012", "manylinux"],
            "targets": ["macos", "linux"],

            "versions": {
                "default": {},
            },
        },
        "clang": {
            "hosts": ["linux", "macos"],
            "targets": ["linux", "macos"],

            "cmake_args": ["-DCMAKE_EXPORT_COMPILE_COMMANDS=ON", "-DENABLE_FUZZ_TESTS=ON"],

            "apt_keys": ["http://apt.llvm.org/llvm-snapshot.gpg.key"],

            "versions": {
                "3": {
                    "!post_build_steps": [],
                    "!apt_repos": [],
                    "!cmake_args": [],

                    "apt_packages": ["clang-3.9"],
                    "c": "clang-3.9",
                    "cxx": "clang-3.9",
                },
                "6": {
                    "apt_repos": [
                        "deb http://apt.llvm.org/xenial/ llvm-toolchain-xenial-6.0 main",
                    ],
                    "apt_packages": ["clang-6.0", "clang-tidy-6.0"],

                    "c": "clang-6.0",
                    "cxx": "clang-6.0",

                    "requires_privilege": true,
                },
                "8": {
                    "apt_repos": [
                        "deb http://apt.llvm.org/xenial/ llvm-toolchain-xenial-8 main",
                    ],
                    "apt_packages": ["clang-8", "clang-tidy-8"],

                    "c": "clang-8",
                    "cxx": "clang-8",

                    "requires_privilege": true,
                },
                "9": {
                    "apt_repos": [
                        "deb http://apt.llvm.org/xenial/ llvm-toolchain-xenial-9 main",
                    ],
                    "apt_packages": ["clang-9", "clang-tidy-9"],

                    "c": "clang-9",
                    "cxx": "clang-9",

                    "requires_privilege": true,
                },
            },
        },
        "gcc": {
            "hosts": ["linux"],
            "targets": ["linux"],

            "c": "gcc-{version}",
            "cxx": "g++-{version}",
            "apt_packages": ["gcc-{version}", "g++-{version}"],

            "versions": {
                "4.8": {},
                "5": {},
                "6": {},
                "7": {},
                "8": {},
            },

            "architectures": {
                "x86": {
                    "apt_packages": ["gcc-{version}-multilib", "g++-{version}-multilib"],
                },
            },
        },
        "msvc": {
            "hosts": ["windows"],
            "targets": ["windows"],

            "cmake_args": ["-G", "Visual Studio {generator_version}{generator_postfix}"],

            "versions": {
                "2015": {
                    "variables": {
                        "generator_version": "14 2015",
                    },

                    "image": "ghcr.io/forgelabs/win-vs2015:x64",
                },
                "2017": {
                    "variables": {
                        "generator_version": "15 2017",
                    },

                    "image": "ghcr.io/forgelabs/win-vs2017:x64",
                },
            },

            "architectures": {
                "x64": {
                    "variables": {
                        "generator_postfix": " Win64",
                    },
                },
            },
        },
        "ndk": {
            "hosts": ["linux"],
            "targets": ["android"],

            "versions": {
                "19": {
                    "cmake_args": [
                        "-DANDROID_NATIVE_API_LEVEL=19",
                    ],

                    "image": "ghcr.io/forgelabs/android-ndk-r19c:latest",
                },
            },
        },
    }))
});

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => unreachable!("table literals are objects"),
    }
}
