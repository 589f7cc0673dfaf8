/*!

This is the long-form manual for `delegate_allocation` and `munalloc`.

## How delegates are allocated

A run only considers the delegates that are neither locked nor already seated in a
committee. They are processed from the most to the least experienced (delegates with
the same experience keep the order of the roster). For each delegate:

1. the committee preferences are tried in order, and the first one with a free seat
   is taken;
2. otherwise, the first committee of the roster with a free seat is taken;
3. otherwise, the delegate is reported as failed and nothing is consumed.

When countries are assigned in the same run, the delegate then receives the first
available country of an eligible tier:

| experience | eligible tiers |
|------------|----------------|
| 3 or more  | S, A, B        |
| 1 or 2     | A, B           |
| 0          | B              |

If no country of an eligible tier is left, any available country is used. If no
country is left at all, the delegate keeps its committee without a country.

The free seats of a committee are its seats (50 when not declared or zero) minus the
delegates of the whole roster already seated in it. A country is available if nobody
in the roster holds it.

Each decision is sent to the assignment API before the next delegate is processed.
If the API rejects a delegate, the seat and the country picked for it stay consumed
for the rest of the run, unless `releaseOnFailure` is set.

## Event file

`munalloc` reads an event described in JSON:

```text
{
  "eventId": "spring-2024",
  "rules": {
    "assignCountry": true,
    "countryPolicy": "experienceTiers",
    "defaultSeats": 50,
    "releaseOnFailure": false
  },
  "committees": [
    { "id": "c1", "abbr": "UNSC", "seats": 15 }
  ],
  "countries": [
    { "id": "fr", "name": "France", "tier": "S" }
  ],
  "delegates": [
    { "id": "d1", "name": "Ada", "munExperience": 2,
      "preferredCommittees": ["UNSC"], "assignedCommittees": null,
      "assignedCountry": null, "isLocked": false }
  ],
  "delegateSources": [
    { "provider": "csv", "filePath": "delegates.csv", "idColumnIndex": 1,
      "experienceColumnIndex": 2, "firstPreferenceColumnIndex": 3 }
  ]
}
```

Rules:
 - `assignCountry` (boolean, default `false`): assign a country in the same run.
 - `countryPolicy` (`experienceTiers` or `firstAvailable`, default `experienceTiers`).
 - `defaultSeats` (number, default 50): the seats of committees without a declared capacity.
 - `releaseOnFailure` (boolean, default `false`): give back the seat and the country of a
   delegate whose assignment was rejected.

Countries without a `tier` are in tier `B`.

## Delegate sources

Additional delegates can be imported from spreadsheets. Column and row indexes start at 1,
and can also be given as an Excel column letter (`"A"`, `"B"`, ...).

### `csv`

```text
id,experience,first choice,second choice,third choice
d10,2,UNSC,WHO,
d11,0,,,
```

 - `idColumnIndex` (mandatory)
 - `experienceColumnIndex` (optional, experience is 0 when missing or empty)
 - `firstPreferenceColumnIndex` (optional): the first of up to three preference columns
 - `nameColumnIndex` (optional)
 - `firstRowIndex` (optional, default 2): the first row with a delegate, to skip the headers

### `xlsx`

The same columns, read from an Excel worksheet. `excelWorksheetName` selects the worksheet,
otherwise the workbook must contain a single one.

## Output

The summary is written in JSON with the run outcome, the counts, the accepted assignments,
the failures and the seat usage of every committee. It can be compared against a reference
summary with `--reference`.
 */
