// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

/// Returns early from the enclosing function if the condition is false
macro_rules! ensure {
    ($cond:expr $(,)?) => {
        ensure!($cond, ())
    };
    ($cond:expr, $ret:expr $(,)?) => {
        if !($cond) {
            return $ret;
        }
    };
}
